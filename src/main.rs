use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;

use sim8086::cpu::executor::execute;
use sim8086::cpu::memory::MemoryCapacity;
use sim8086::cpu::state::MachineState;
use sim8086::decode::Decoder;
use sim8086::error::SimError;
use sim8086::platforms::x86_8086::register::SLOT_NAMES;
use sim8086::printer;

/// Decodes (and optionally simulates) a flat binary of 8086 machine code.
#[derive(Parser, Debug)]
#[command(name = "sim8086", about = "Decode and simulate a subset of the 8086 instruction set")]
struct Cli {
    /// Input binary file of 8086 machine code.
    filename: PathBuf,

    /// Decode and execute, rather than just emitting the listing.
    #[arg(long = "exec")]
    exec: bool,

    /// Write `sim86_memory_0.data` after execution. Requires `--exec`.
    #[arg(long = "dump")]
    dump: bool,

    /// Linear memory capacity backing the simulated machine.
    #[arg(long = "memory-size", value_enum, default_value = "64k")]
    memory_size: MemorySizeArg,

    /// Additionally print the final machine state as JSON on stdout.
    #[arg(long = "json")]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MemorySizeArg {
    #[value(name = "64k")]
    Small64Kib,
    #[value(name = "1m")]
    Large1Mib,
}

impl From<MemorySizeArg> for MemoryCapacity {
    fn from(value: MemorySizeArg) -> Self {
        match value {
            MemorySizeArg::Small64Kib => MemoryCapacity::Small64Kib,
            MemorySizeArg::Large1Mib => MemoryCapacity::Large1Mib,
        }
    }
}

/// The tail written past the code region exposes any data the program
/// wrote past its own image, matching the reference tool's dump size.
const MEMORY_DUMP_TAIL: usize = 16 * 1024;

#[derive(serde::Serialize)]
struct FinalState {
    registers: std::collections::BTreeMap<&'static str, u16>,
    flags: String,
}

impl FinalState {
    fn capture(state: &MachineState) -> Self {
        let registers = MachineState::all_slots()
            .into_iter()
            .map(|slot| (SLOT_NAMES[slot as usize], state.register_word(slot)))
            .collect();
        FinalState {
            registers,
            flags: state.flags.to_string(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse_from(normalize_single_dash_flags(std::env::args()));
    if let Err(err) = run(cli).await {
        eprintln!("{}", format!("error: {err}").red());
        std::process::exit(1);
    }
}

/// Accepts the original tool's single-dash `-exec`/`-dump` spelling
/// alongside clap's standard `--exec`/`--dump`, so either invocation style
/// works.
fn normalize_single_dash_flags(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| match arg.as_str() {
        "-exec" => "--exec".to_string(),
        "-dump" => "--dump".to_string(),
        other => other.to_string(),
    })
    .collect()
}

async fn run(cli: Cli) -> Result<(), SimError> {
    if cli.dump && !cli.exec {
        return Err(SimError::Usage("-dump requires -exec".to_string()));
    }

    let capacity = MemoryCapacity::from(cli.memory_size);
    let path = cli.filename.display().to_string();

    let image = tokio::fs::read(&cli.filename)
        .await
        .map_err(|err| SimError::Io {
            path: path.clone(),
            message: err.to_string(),
        })?;

    if image.len() > capacity.bytes() {
        return Err(SimError::Usage(format!(
            "{} is {} bytes, which exceeds the {} byte memory capacity",
            path,
            image.len(),
            capacity.bytes()
        )));
    }

    let mut state = cli.exec.then(|| {
        let mut state = MachineState::new(capacity);
        state.memory.load_image(&image);
        state
    });

    let mut decoder = Decoder::new(&image, 0);
    let mut lines = vec!["bits 16".to_string()];

    while !decoder.at_end() {
        if let Some(state) = state.as_mut() {
            state.snapshot();
        }

        let instr = decoder.decode_next()?;
        let text = printer::render_instruction(&instr);

        match state.as_mut() {
            Some(state) => {
                state.set_ip(decoder.ip());
                execute(&instr, state)?;
                decoder.set_ip(state.ip());
                lines.push(format!("{text}{}", printer::render_diff(&instr, state)));
            }
            None => lines.push(text),
        }
    }

    let listing_path = format!("{path}_decoded.asm");
    tokio::fs::write(&listing_path, lines.join("\n") + "\n")
        .await
        .map_err(|err| SimError::Io {
            path: listing_path.clone(),
            message: err.to_string(),
        })?;

    if let Some(state) = state.as_ref() {
        println!("{}", printer::render_final_registers(state).bold());

        if cli.json {
            let snapshot = FinalState::capture(state);
            let json = serde_json::to_string_pretty(&snapshot).expect("FinalState has no non-serializable fields");
            println!("{json}");
        }

        if cli.dump {
            let dump_len = (image.len() + MEMORY_DUMP_TAIL).min(state.memory.capacity());
            tokio::fs::write("sim86_memory_0.data", &state.memory.as_slice()[..dump_len])
                .await
                .map_err(|err| SimError::Io {
                    path: "sim86_memory_0.data".to_string(),
                    message: err.to_string(),
                })?;
        }
    }

    Ok(())
}

use std::{env, fs};

use armvm::bytecode::disasm;
use armvm::{SimArm, Vm};

fn main() {
    let args: Vec<String> = env::args().collect();

    let show_disasm = args.contains(&"--disasm".to_string());
    let trace = args.contains(&"--trace".to_string());
    let max_steps = flag_value(&args, "--max-steps").unwrap_or(1_000_000);

    // first non-flag argument is the image filename
    let filename = args.iter().skip(1).find(|a| !a.starts_with('-'));

    let filename = match filename {
        Some(f) => f,
        None => {
            print_usage();
            std::process::exit(1);
        }
    };

    let image = match fs::read(filename) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            std::process::exit(1);
        }
    };

    let mut vm = match Vm::load(image) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("Failed to load '{}': {}", filename, e);
            std::process::exit(1);
        }
    };

    if show_disasm {
        print!("{}", disasm::disassemble(vm.program_bytes()));
        return;
    }

    let mut arm = SimArm::auto();
    let mut steps: u64 = 0;
    while vm.status().is_running() && steps < max_steps {
        if trace {
            println!("pc={:#06x} top={}", vm.program_counter(), vm.stack_top());
        }
        vm.step(&mut arm);
        steps += 1;
    }

    if vm.status().is_running() {
        eprintln!("still running after {} steps, giving up", steps);
        std::process::exit(1);
    }

    println!("{} after {} steps at pc={:#06x}", vm.status(), steps, vm.program_counter());
    for v in &arm.printed {
        println!("print: {}", v);
    }
    if let Some(top) = vm.stack_top().checked_sub(1).and_then(|off| vm.peek(off)) {
        println!("top of stack: {:?}", top);
    }

    if vm.status().is_fault() {
        std::process::exit(2);
    }
}

/// `--flag N` lookup; exits on a malformed value, like any other bad usage.
fn flag_value(args: &[String], flag: &str) -> Option<u64> {
    let pos = args.iter().position(|a| a == flag)?;
    match args.get(pos + 1).map(|v| v.parse()) {
        Some(Ok(n)) => Some(n),
        _ => {
            eprintln!("{} expects a number", flag);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("usage: armvm <image.bin> [--disasm] [--trace] [--max-steps N]");
}

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use anyhow::{Context, Result};
use clap::Parser;

use memsim::{Args, Signal, Simulator};

pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut simulator = Simulator::new(args.cache_policy, args.page_policy);

    match args.script {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("cannot open script {}", path))?;
            run(&mut simulator, BufReader::new(file), false)
        }
        None => {
            Simulator::print_banner();
            run(&mut simulator, io::stdin().lock(), true)
        }
    }
}

fn run<R: BufRead>(simulator: &mut Simulator, reader: R, interactive: bool) -> Result<()> {
    let mut stdout = io::stdout();
    if interactive {
        print!("> ");
        stdout.flush()?;
    }
    for line in reader.lines() {
        if simulator.execute(&line?) == Signal::Exit {
            break;
        }
        if interactive {
            print!("> ");
            stdout.flush()?;
        }
    }
    Ok(())
}

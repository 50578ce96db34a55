//! Command-line runner: loads S-record images into RAM, resets the CPU and
//! runs until the program stops itself, then reports the effective clock
//! speed.

#[macro_use]
extern crate log;

mod srec;

use std::env;
use std::io::{self, Read, Write};
use std::process;
use std::time::Instant;

use clap::{App, Arg};
use w65c816::{lo, Cpu, Memory};

const RAM_SIZE: u32 = 512 * 1024;
const MEM_MASK: u32 = 512 * 1024 - 1;

fn main() {
    let args = App::new("run816")
        .version(env!("CARGO_PKG_VERSION"))
        .about("WDC 65C816 emulator")
        .help_short("?")
        .arg(Arg::with_name("debug")
            .short("d")
            .help("Trace every executed instruction"))
        .arg(Arg::with_name("image")
            .required(true)
            .multiple(true)
            .value_name("SREC_FILE")
            .help("S-record images to load"))
        .get_matches();

    let debug = args.is_present("debug");
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", if debug { "trace" } else { "info" });
    }
    env_logger::init();

    let mut mem = Memory::new(MEM_MASK, RAM_SIZE, None);
    for path in args.values_of("image").unwrap() {
        if let Err(e) = srec::load(path, &mut mem) {
            eprintln!("load failed '{}': {}", path, e);
            process::exit(-1);
        }
        info!("loaded {}", path);
    }

    let mut cpu = Cpu::new(mem);
    cpu.trace = debug;
    cpu.set_wdm_hook(|cpu, value| match value {
        // Console put: write the low byte of A
        0x01 => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let _ = out.write_all(&[lo(cpu.a)]);
            let _ = out.flush();
        }
        // Console get: read one byte into the low byte of A
        0x02 => {
            let mut buf = [0u8; 1];
            if io::stdin().read_exact(&mut buf).is_ok() {
                cpu.a = (cpu.a & 0xff00) | u16::from(buf[0]);
            }
        }
        0xff => cpu.stop(),
        _ => {}
    });

    let start = Instant::now();
    cpu.run();
    let secs = start.elapsed().as_secs_f64();

    let cycles = cpu.cycles();
    println!();
    println!("Executed {} cycles in {:.6} secs", cycles, secs);
    let mut speed = cycles as f64 / secs;
    if speed < 1000.0 {
        println!("Overall CPU frequency = {:.3} Hz", speed);
    } else {
        speed /= 1000.0;
        if speed < 1000.0 {
            println!("Overall CPU frequency = {:.3} KHz", speed);
        } else {
            println!("Overall CPU frequency = {:.3} MHz", speed / 1000.0);
        }
    }
}

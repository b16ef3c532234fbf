use clap::Parser;
use clap_num::maybe_hex;
use lazy_static::lazy_static;
use z80core::logger;

#[derive(Parser, Debug)]
#[command(author,version,about,long_about=None)]
pub struct Args {
    /// Raw binary image loaded into RAM
    pub file: String,

    /// Address at which the image is loaded (hex ok with '0x')
    #[arg(long,value_parser=maybe_hex::<u16>, default_value_t=0x0000_u16)]
    pub load_addr: u16,

    /// Raw ROM image mapped for reads at address 0 (writes fall through to RAM)
    #[arg(long)]
    pub rom: Option<String>,

    /// Size of the ROM window; also the bank size of the memory map
    #[arg(long,value_parser=maybe_hex::<usize>, default_value_t=0x4000_usize)]
    pub rom_size: usize,

    /// Start execution here instead of the reset address
    #[arg(long,value_parser=maybe_hex::<u16>)]
    pub start: Option<u16>,

    /// CPU clock frequency in Hz
    #[arg(short, long, default_value_t = 4_000_000_u64)]
    pub freq: u64,

    /// Real-time multiplier: 1.0 runs at the nominal frequency, 2.0 at half speed
    #[arg(long, default_value_t = 1.0)]
    pub delay: f32,

    /// Log levels separated by '|' (error, warning, info, debug, all, none)
    #[arg(long, default_value_t = String::from(logger::DEFAULT_LOGLEVEL))]
    pub loglevel: String,

    /// Write log output to this file instead of stderr
    #[arg(long)]
    pub logfile: Option<String>,

    /// Breakpoint as "<addr> [<cond>]", e.g. "$8010 ra >= 80" (repeatable)
    #[arg(short, long = "break")]
    pub breakpoints: Vec<String>,

    /// Also break at the reset address
    #[arg(short = 's', long)]
    pub break_start: bool,

    /// Trace each machine instruction as it is executed
    #[arg(short, long)]
    pub trace: bool,

    /// Stop when the CPU enters HALT
    #[arg(short = 'x', long)]
    pub exit_on_halt: bool,

    /// Print the CPU status and a disassembly around PC on exit
    #[arg(short, long)]
    pub dump: bool,
}

lazy_static! {
    pub static ref ARGS: Args = if cfg!(test) {
        // manually set parameters for running tests
        Args::parse_from(["test", "test.bin"])
    } else {
        Args::parse()
    };
}

/// Level specification including the trace level when requested.
pub fn loglevel() -> String {
    if ARGS.trace {
        format!("{}|debug", ARGS.loglevel)
    } else {
        ARGS.loglevel.clone()
    }
}

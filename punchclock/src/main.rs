use clap::Parser;
use eyre::Result;
use punchclock::command::PunchclockCmd;
use punchclock::VERSION;

#[derive(Parser)]
#[command(
    author = "Sam Uherek",
    version = VERSION,
    about = "Clock in and out, online or not",
    )]
struct Punchclock {
    #[command(subcommand)]
    punchclock: PunchclockCmd,
}

impl Punchclock {
    fn run(self) -> Result<()> {
        self.punchclock.run()
    }
}

fn main() -> Result<()> {
    Punchclock::parse().run()
}

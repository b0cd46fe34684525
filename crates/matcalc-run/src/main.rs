use clap::Parser;

fn main() -> miette::Result<()> {
    matcalc_run::Cli::parse().run()
}

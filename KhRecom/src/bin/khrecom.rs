fn main() -> anyhow::Result<()> {
    khrecom::cli::run_cli()
}

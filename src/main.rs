fn main() {
    #[cfg(feature = "cli")]
    diffwcx::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("diffwcx: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

fn main() -> anyhow::Result<()> {
    let args = std::env::args().collect::<Vec<_>>();

    build_android_lib::cli::run(args)
}

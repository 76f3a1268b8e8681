fn main() -> anyhow::Result<()> {
    chat_timeline::cli::run()
}

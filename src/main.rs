fn main() -> anyhow::Result<()> {
    event_board::run()
}

fn main() -> anyhow::Result<()> {
    eventsphere_lib::run()
}

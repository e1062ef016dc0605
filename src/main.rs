fn main() -> anyhow::Result<()> {
    wayfarer::app::run()
}

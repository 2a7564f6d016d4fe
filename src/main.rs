fn main() -> anyhow::Result<()> {
    immunoref_lib::run()
}

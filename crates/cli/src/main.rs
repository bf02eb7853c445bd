fn main() -> Result<(), Box<dyn std::error::Error>> {
    classdex_cli::run()
}

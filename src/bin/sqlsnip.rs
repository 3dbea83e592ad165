fn main() {
    sqlsnip::cli::run();
}

fn main() -> std::process::ExitCode {
    rigkey_lib::run()
}

use std::process;

fn main() {
    let code = timidc_drv::main_with_args(std::env::args().skip(1));
    process::exit(code);
}

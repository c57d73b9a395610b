fn main() {
    brostop_lib::run()
}

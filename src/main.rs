fn main() {
    answer_lens_lib::run()
}

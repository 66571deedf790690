fn main() {
    graph_hierarchy::cli::run();
}

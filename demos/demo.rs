use tabula::{DataType, Graph, RangeFlags, Sort, Table, Value};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // --- Tables, indexes, predicates ---

    let mut table = Table::new();
    table.add_column("name", DataType::Text).unwrap();
    table.add_column("size", DataType::Int).unwrap();
    table.add_column("selected", DataType::Bool).unwrap();

    for (name, size) in [("alpha", 5), ("beta", 3), ("gamma", 5), ("delta", 1), ("eps", 9)] {
        let tuple = table.add_row();
        table.set_str(tuple, "name", name).unwrap();
        table.set_int(tuple, "size", size).unwrap();
        table.set_bool(tuple, "selected", size > 3).unwrap();
    }

    table.create_index("size").unwrap();
    let index = table.index("size").unwrap();
    println!(
        "size index: min row {:?}, max row {:?}, {} distinct keys",
        index.minimum(),
        index.maximum(),
        index.unique_count()
    );

    let in_range: Vec<usize> = index
        .rows_int(2, 5, RangeFlags::ascending())
        .unwrap()
        .collect();
    println!("rows with size in [2, 5]: {in_range:?}");

    let predicate = table.parse_predicate("size > 3 AND selected").unwrap();
    for tuple in table.tuples_where(&predicate).unwrap() {
        println!(
            "match: {} (size {})",
            tuple.get_str("name").unwrap(),
            tuple.get_int("size").unwrap()
        );
    }

    for tuple in table
        .tuples_sorted(None, &Sort::descending("size").then_ascending("name"))
        .unwrap()
    {
        println!(
            "sorted: {} {}",
            tuple.get_str("name").unwrap(),
            tuple.get_int("size").unwrap()
        );
    }

    // --- Graphs with attributes and a spanning tree ---

    let mut graph = Graph::new(true);
    graph.add_node_column("label", DataType::Text).unwrap();

    let root = graph.add_node();
    graph
        .set_node_value(root, "label", &Value::from("root"))
        .unwrap();
    let mut previous = root;
    for label in ["a", "b", "c"] {
        let node = graph.add_node();
        graph
            .set_node_value(node, "label", &Value::from(label))
            .unwrap();
        graph.add_edge(previous, node).unwrap();
        previous = node;
    }
    graph.add_edge(root, previous).unwrap();

    graph.build_spanning_tree(root).unwrap();
    for node in graph.node_tuples().collect::<Vec<_>>() {
        let label = graph.nodes().get_str(node.tuple(), "label").unwrap();
        println!(
            "node {} depth {:?} degree {}",
            label,
            graph.tree_depth(node).unwrap(),
            graph.degree(node).unwrap()
        );
    }
}

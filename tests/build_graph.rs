use ripple::graph::{self, NodeKind};
use ripple::graph::codec;
use ripple::model::{
    ClassDef, FuncDef, ImportKind, ImportRef, Language, ParseResult, ParseResults,
};

fn import(name: &str) -> ImportRef {
    ImportRef {
        name: name.to_string(),
        alias: None,
        module: None,
        kind: ImportKind::Plain,
    }
}

fn rich_results() -> ParseResults {
    let mut results = ParseResults::new();

    let mut core = ParseResult::empty(Language::Python);
    core.functions.push(FuncDef {
        name: "make_greeter".to_string(),
        line: 10,
        decorators: Vec::new(),
        args: vec!["name".to_string()],
    });
    core.classes.push(ClassDef {
        name: "Greeter".to_string(),
        line: 3,
        bases: vec!["Base".to_string()],
        methods: vec!["greet".to_string()],
    });
    core.async_functions.push(FuncDef {
        name: "fetch_profile".to_string(),
        line: 20,
        decorators: Vec::new(),
        args: Vec::new(),
    });
    results.insert("pkg/core.py".to_string(), core);

    let mut app = ParseResult::empty(Language::Python);
    app.imports.push(import("pkg.core"));
    results.insert("pkg/app.py".to_string(), app);

    results
}

#[test]
fn file_and_symbol_nodes_materialize() {
    let graph = graph::build(&rich_results());

    assert!(graph.contains("pkg/core.py"));
    assert_eq!(
        graph.node("pkg/core.py::make_greeter").unwrap().kind,
        NodeKind::Function
    );
    assert_eq!(
        graph.node("pkg/core.py::Greeter").unwrap().kind,
        NodeKind::Class
    );
    assert_eq!(
        graph.node("pkg/core.py::fetch_profile").unwrap().kind,
        NodeKind::AsyncFunction
    );
    assert_eq!(
        graph
            .node("pkg/core.py::Greeter")
            .unwrap()
            .parent_file
            .as_deref(),
        Some("pkg/core.py")
    );
}

#[test]
fn import_edge_resolved_to_file() {
    let graph = graph::build(&rich_results());
    let edges: Vec<(&str, &str)> = graph.edges().map(|(s, t, _)| (s, t)).collect();
    assert_eq!(edges, vec![("pkg/app.py", "pkg/core.py")]);
}

#[test]
fn construction_is_insertion_order_independent() {
    let forward = rich_results();
    let mut reversed = ParseResults::new();
    for (path, result) in forward.iter().rev() {
        reversed.insert(path.clone(), result.clone());
    }

    let a = graph::build(&forward);
    let b = graph::build(&reversed);

    let ids_a: Vec<&str> = {
        let mut v: Vec<&str> = a.node_ids().collect();
        v.sort();
        v
    };
    let ids_b: Vec<&str> = {
        let mut v: Vec<&str> = b.node_ids().collect();
        v.sort();
        v
    };
    assert_eq!(ids_a, ids_b);
    assert_eq!(a.edge_count(), b.edge_count());
    for id in ids_a {
        let na = a.node(id).unwrap();
        let nb = b.node(id).unwrap();
        assert_eq!(na.kind, nb.kind);
        assert_eq!(na.centrality, nb.centrality);
    }
}

#[test]
fn store_document_round_trips_through_json() {
    let graph = graph::build(&rich_results());
    let document = codec::encode(&graph, "shop", "main");

    let json = serde_json::to_string(&document).unwrap();
    let parsed: codec::GraphDocument = serde_json::from_str(&json).unwrap();
    let decoded = codec::decode(&parsed);

    assert_eq!(decoded.node_count(), graph.node_count());
    assert_eq!(decoded.edge_count(), graph.edge_count());
    for node in graph.nodes() {
        let restored = decoded.node(&node.id).unwrap();
        assert_eq!(restored.kind, node.kind);
        assert_eq!(restored.centrality, node.centrality);
    }
}

#[test]
fn node_link_document_accepted_from_raw_json() {
    let raw = r#"{
        "directed": true,
        "multigraph": false,
        "graph": {},
        "nodes": [
            {"id": "a.py", "type": "file", "degree_centrality": 0.5,
             "betweenness_centrality": 0.0, "closeness_centrality": 0.0},
            {"id": "b.py", "type": "file"}
        ],
        "links": [
            {"source": "a.py", "target": "b.py", "type": "import", "weight": 1}
        ]
    }"#;
    let document: codec::NodeLinkDocument = serde_json::from_str(raw).unwrap();
    let graph = codec::from_node_link(&document);

    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.node("a.py").unwrap().centrality.degree, 0.5);
    assert!(graph.descendants("a.py").contains("b.py"));
}

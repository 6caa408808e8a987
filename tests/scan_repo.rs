use ripple::graph;
use ripple::model::Language;
use ripple::orchestrator::Orchestrator;
use ripple::parser::ArtifactParser;
use ripple::request::{AnalysisRequest, AnalysisStatus};
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "pkg/core.py",
        "class Greeter:\n    def greet(self):\n        pass\n\ndef make_greeter(name):\n    return Greeter()\n",
    );
    write(root, "pkg/app.py", "import pkg.core\n\ndef run():\n    pass\n");
    write(root, "bad.py", "def broken(:\n");
    write(root, "web/index.js", "import { run } from './app.js';\n");
    write(root, "node_modules/left-pad/index.js", "module.exports = 1;\n");
    write(root, "README.md", "# fixture\n");
    dir
}

#[test]
fn parse_directory_collects_supported_files() {
    let dir = fixture_repo();
    let mut parser = ArtifactParser::new().unwrap();
    let results = parser.parse_directory(dir.path()).unwrap();

    let paths: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["bad.py", "pkg/app.py", "pkg/core.py", "web/index.js"]
    );

    assert_eq!(results["bad.py"].error.as_deref(), Some("syntax_error"));
    assert_eq!(results["pkg/core.py"].language, Language::Python);
    assert_eq!(results["pkg/core.py"].classes.len(), 1);
    // Methods land in the function list too, same as a full tree walk.
    assert_eq!(results["pkg/core.py"].functions.len(), 2);
    assert_eq!(results["pkg/app.py"].imports[0].name, "pkg.core");
}

#[test]
fn scan_to_analysis_end_to_end() {
    let dir = fixture_repo();
    let mut parser = ArtifactParser::new().unwrap();
    let results = parser.parse_directory(dir.path()).unwrap();
    let graph = graph::build(&results);

    // bad.py parsed with an error: no node, no edges.
    assert!(!graph.contains("bad.py"));
    assert!(graph.descendants("pkg/app.py").contains("pkg/core.py"));

    let request = AnalysisRequest {
        change_description: "rename Greeter".to_string(),
        affected_files: vec!["pkg/core.py".to_string()],
        repo_id: "fixture".to_string(),
        branch: "main".to_string(),
        dependency_graph: None,
    };
    let response = Orchestrator::new().run(&request, Some(&graph), None);

    assert_eq!(response.status, AnalysisStatus::Completed);
    assert!(
        response
            .impact_analysis
            .impacted_components
            .contains(&"pkg/app.py".to_string())
    );
    // Impact propagates along import edges only; symbol nodes stay out of
    // the reachable set.
    assert!(
        !response
            .impact_analysis
            .impacted_components
            .contains(&"pkg/core.py::Greeter".to_string())
    );
}

//! End-to-end generation runs over a copy of the shop fixture.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use testweaver_core::output::{build_report, report_path, write_output};
use testweaver_core::pipeline::{GenerationRequest, ProgressCallback, TestGeneratorEngine};
use testweaver_core::CancellationToken;

const GENERATED: &[&str] = &[
    "Controllers/OrdersControllerTests.cs",
    "Models/CalculatorTests.cs",
    "Models/OrderTests.cs",
    "Processing/ProcessorTests.cs",
    "Services/OrderServiceTests.cs",
];

fn run(root: &std::path::Path, request: &GenerationRequest) -> testweaver_core::model::GenerationResult {
    TestGeneratorEngine::new(project_config(root)).run(request, None, &CancellationToken::new())
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[test]
fn full_run_generates_mirrored_test_files() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let result = run(root, &GenerationRequest::for_project(root));

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(list_files(&root.join("GeneratedTests")), GENERATED);

    let stats = &result.statistics;
    // ShopTests/OrderServiceTests.cs is excluded by the `**/*Tests.cs` glob.
    assert_eq!(stats.files_analyzed, 6);
    assert_eq!(stats.files_skipped, 0);
    assert_eq!(stats.test_files_created, 5);
    assert_eq!(stats.test_files_updated, 0);
    assert_eq!(stats.existing_test_files, 1);
    assert_eq!(stats.existing_test_methods, 1);
    assert_eq!(stats.classes_covered, 5);
    assert_eq!(stats.test_cases_generated, result.test_cases.len());
    assert_eq!(stats.framework_breakdown["xunit"], 5);
    assert_eq!(stats.file_type_breakdown["csharp"], 6);
    // Every public method except the already tested PlaceOrder.
    assert!(stats.coverage_estimate > 80.0 && stats.coverage_estimate < 90.0);
    for phase in ["structure", "existing_tests", "discovery", "analysis", "generation", "validation"] {
        assert!(stats.phase_timings.contains_key(phase), "missing timing for {phase}");
    }

    // Build output and checked-in tests are never targets.
    assert!(result.test_cases.iter().all(|c| c.target_class != "Junk"));
    assert!(result.test_cases.iter().all(|c| c.target_method != "PlaceOrder"));
}

#[test]
fn rerun_is_deterministic_and_backs_up() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let request = GenerationRequest::for_project(root);
    let output = root.join("GeneratedTests");

    let first = run(root, &request);
    assert!(first.success);
    let before = std::fs::read_to_string(output.join("Services/OrderServiceTests.cs")).unwrap();
    std::fs::write(output.join("Stale.cs"), "// left over").unwrap();

    let second = run(root, &request);
    assert!(second.success, "errors: {:?}", second.errors);
    assert_eq!(second.test_cases.len(), first.test_cases.len());
    assert_eq!(second.statistics.test_files_updated, 5);
    assert_eq!(second.statistics.test_files_created, 0);

    let after = std::fs::read_to_string(output.join("Services/OrderServiceTests.cs")).unwrap();
    assert_eq!(before, after);
    assert_eq!(list_files(&output), GENERATED);
    assert!(root.join("GeneratedTests.backup/Stale.cs").is_file());
}

#[test]
fn ignoring_existing_tests_covers_tested_methods() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let request = GenerationRequest {
        ignore_existing_tests: true,
        ..GenerationRequest::for_project(root)
    };
    let result = run(root, &request);
    assert!(result.success);
    assert_eq!(result.statistics.existing_test_files, 0);
    assert!(!result.statistics.phase_timings.contains_key("existing_tests"));
    assert!(result
        .test_cases
        .iter()
        .any(|c| c.test_name == "PlaceOrder_WithNullOrder_ThrowsArgumentNullException"));
}

#[test]
fn explicit_files_and_output_override() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let request = GenerationRequest {
        output_path: Some("out".into()),
        files: vec![
            root.join("Models/Calculator.cs"),
            root.join("Models/Missing.cs"),
        ],
        ..GenerationRequest::for_project(root)
    };
    let result = run(root, &request);
    assert!(result.success);
    assert_eq!(result.statistics.files_analyzed, 1);
    assert_eq!(result.statistics.files_skipped, 1);
    assert!(result.warnings.iter().any(|w| w.contains("Missing.cs")));
    assert_eq!(list_files(&root.join("out")), vec!["Models/CalculatorTests.cs"]);
    assert!(!root.join("GeneratedTests").exists());
}

#[test]
fn output_inside_sources_is_refused() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let request = GenerationRequest {
        output_path: Some(root.join("Models")),
        files: vec![root.join("Models/Calculator.cs")],
        ..GenerationRequest::for_project(root)
    };
    let result = run(root, &request);
    assert!(!result.success);
    assert!(root.join("Models/Calculator.cs").is_file());
    assert!(result.errors[0].contains("refusing to purge"));
}

#[test]
fn progress_reports_every_phase() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let progress: ProgressCallback = {
        let seen = Rc::clone(&seen);
        Box::new(move |name, _label| seen.borrow_mut().push(name.to_string()))
    };
    let result = TestGeneratorEngine::new(project_config(root)).run(
        &GenerationRequest::for_project(root),
        Some(progress),
        &CancellationToken::new(),
    );
    assert!(result.success);
    assert_eq!(
        *seen.borrow(),
        vec!["structure", "existing_tests", "discovery", "analysis", "generation", "validation"]
    );
}

#[test]
fn cancelled_run_writes_nothing() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = TestGeneratorEngine::new(project_config(root)).run(
        &GenerationRequest::for_project(root),
        None,
        &cancel,
    );
    assert!(!result.success);
    assert!(!root.join("GeneratedTests").exists());
}

// ---------------------------------------------------------------------------
// Preview and report
// ---------------------------------------------------------------------------

#[test]
fn preview_matches_written_file() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let engine = TestGeneratorEngine::new(project_config(root));
    let preview = engine
        .preview_file(&root.join("Services/OrderService.cs"))
        .unwrap()
        .unwrap();
    assert!(!root.join("GeneratedTests").exists());

    let result = engine.run(
        &GenerationRequest::for_project(root),
        None,
        &CancellationToken::new(),
    );
    assert!(result.success);
    let written = std::fs::read_to_string(root.join("GeneratedTests/Services/OrderServiceTests.cs")).unwrap();
    assert_eq!(preview, written);

    let interface = engine
        .preview_file(&root.join("Repositories/IOrderRepository.cs"))
        .unwrap();
    assert!(interface.is_none());
}

#[test]
fn report_summarises_run() {
    let dir = copy_fixture("csharp_shop");
    let root = dir.path();
    let result = run(root, &GenerationRequest::for_project(root));
    let path = report_path(&root.join("GeneratedTests"));
    write_output(&build_report(&result, root), &path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["summary"]["files_generated"], 5);
    assert_eq!(json["classes"]["Calculator"], 6);
    assert_eq!(json["classes"]["OrderService"], 6);
    assert_eq!(json["files"].as_array().unwrap().len(), 5);
}

//! C# test synthesis: scenarios per member, arrange/act/assert fragments,
//! Moq setup and verification lines, template data and file output.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{json, Value};

use super::files;
use super::framework::TestFramework;
use super::values::{mock_argument, test_value, zero_value};
use super::TestGenerator;
use crate::cancel::CancellationToken;
use crate::config::GeneratorConfig;
use crate::error::GenerationError;
use crate::heuristics::{self, camel_case, pascal_case};
use crate::model::{
    AccessModifier, AnalysisResult, ClassInfo, ConstructorInfo, DependencyInfo,
    GeneratedTestFile, MethodInfo, ParameterInfo, TestCase, TestType,
};
use crate::templates::TemplateRegistry;

const NULL_EXCEPTION: &str = "ArgumentNullException";

/// Mock syntax emitted for every dependency (`Mock<T>`, `Setup`, `Verify`).
const MOCK_NAMESPACE: &str = "Moq";

/// Generator switches taken from the configuration document.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub include_private_methods: bool,
    pub include_internal_methods: bool,
    pub generate_mocks: bool,
    pub generate_negative_tests: bool,
    pub test_method_prefix: String,
    /// Configured framework, used when the project itself names none.
    pub framework: Option<TestFramework>,
    pub test_file_naming: String,
    pub create_backups: bool,
}

impl GeneratorSettings {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        let mock_framework = config.generation.mock_framework.trim();
        if !mock_framework.is_empty() && !mock_framework.eq_ignore_ascii_case(MOCK_NAMESPACE) {
            warn!("Mock framework {mock_framework} is not supported, generating Moq mocks instead");
        }
        Self {
            include_private_methods: config.analysis.include_private_methods,
            include_internal_methods: config.analysis.include_internal_methods,
            generate_mocks: config.analysis.generate_mocks,
            generate_negative_tests: config.generation.generate_negative_tests,
            test_method_prefix: config.generation.test_method_prefix.clone(),
            framework: config
                .project
                .test_frameworks
                .get("csharp")
                .and_then(|kind| TestFramework::from_kind(kind)),
            test_file_naming: config.output.test_file_naming.clone(),
            create_backups: config.output.create_backups,
        }
    }
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Input condition of one generated test.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Input {
    Valid,
    Null(usize),
    Zero(usize),
    Empty(usize),
}

struct MockLines {
    setup: String,
    verify: String,
}

/// Everything the per-member builders need about the class under test.
struct ClassContext<'a> {
    result: &'a AnalysisResult,
    class: &'a ClassInfo,
    framework: TestFramework,
    dependencies: Vec<&'a DependencyInfo>,
    mocks: Vec<MockLines>,
    can_construct: bool,
}

impl ClassContext<'_> {
    fn dependency_for(&self, param: &ParameterInfo) -> Option<&DependencyInfo> {
        self.dependencies.iter().copied().find(|d| d.name == param.name)
    }

    fn setups(&self) -> Vec<String> {
        self.mocks.iter().map(|m| m.setup.clone()).collect()
    }

    fn verifications(&self) -> Vec<String> {
        self.mocks.iter().map(|m| m.verify.clone()).collect()
    }
}

fn mock_field(dependency_name: &str) -> String {
    format!("_{}Mock", camel_case(dependency_name))
}

/// `T` of `Task<T>` or `ValueTask<T>`.
fn task_result_type(return_type: &str) -> Option<&str> {
    let rt = return_type.trim();
    rt.strip_prefix("Task<")
        .or_else(|| rt.strip_prefix("ValueTask<"))
        .and_then(|inner| inner.strip_suffix('>'))
}

fn has_result(return_type: &str) -> bool {
    !matches!(return_type.trim(), "void" | "Task" | "ValueTask")
}

fn returns_clause(return_type: &str) -> String {
    match return_type.trim() {
        "void" => String::new(),
        "Task" => ".Returns(Task.CompletedTask)".to_string(),
        "ValueTask" => ".Returns(ValueTask.CompletedTask)".to_string(),
        rt => match task_result_type(rt) {
            Some(inner) => format!(".ReturnsAsync({})", test_value(inner)),
            None => format!(".Returns({})", test_value(rt)),
        },
    }
}

/// Setup and verification for one mocked dependency, targeting the first
/// non-accessor method of its interface when that interface was analysed.
fn mock_lines(result: &AnalysisResult, dependency: &DependencyInfo) -> MockLines {
    let mock = mock_field(&dependency.name);
    let dependency_type = dependency
        .interface_type
        .as_deref()
        .unwrap_or(&dependency.dependency_type);
    let target = result
        .find_type(heuristics::simple_type_name(dependency_type))
        .and_then(|t| {
            t.methods
                .iter()
                .find(|m| !m.name.starts_with("get_") && !m.name.starts_with("set_"))
        });

    match target {
        Some(method) => {
            let args = method
                .parameters
                .iter()
                .map(|p| mock_argument(&p.param_type))
                .collect::<Vec<_>>()
                .join(", ");
            let call = format!("x => x.{}({args})", method.name);
            MockLines {
                setup: format!("{mock}.Setup({call}){};", returns_clause(&method.return_type)),
                verify: format!("{mock}.Verify({call}, Times.Once);"),
            }
        }
        None => MockLines {
            setup: format!("{mock}.Setup(x => x.GetAsync(It.IsAny<int>()));"),
            verify: format!("{mock}.Verify(x => x.GetAsync(It.IsAny<int>()), Times.Once);"),
        },
    }
}

/// Public non-static constructors.
fn public_constructors(class: &ClassInfo) -> impl DoubleEndedIterator<Item = &ConstructorInfo> {
    class
        .constructors
        .iter()
        .filter(|c| !c.is_static && c.access_modifier == AccessModifier::Public)
}

/// Whether tests can instantiate the class with a public constructor.
fn can_construct(class: &ClassInfo) -> bool {
    if class.is_static || class.is_abstract || class.is_interface {
        return false;
    }
    let has_instance_ctor = class.constructors.iter().any(|c| !c.is_static);
    !has_instance_ctor || public_constructors(class).next().is_some()
}

fn call_arguments(params: &[ParameterInfo]) -> String {
    params
        .iter()
        .map(|p| {
            if p.is_out {
                format!("out var {}", p.name)
            } else if p.is_ref {
                format!("ref {}", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn act_lines(call: &str, is_async: bool, expects_exception: bool, has_result: bool) -> Vec<String> {
    let line = match (expects_exception, is_async, has_result) {
        (true, true, _) => format!("Func<Task> act = async () => await {call};"),
        (true, false, _) => format!("Action act = () => {call};"),
        (false, true, true) => format!("var result = await {call};"),
        (false, true, false) => format!("await {call};"),
        (false, false, true) => format!("var result = {call};"),
        (false, false, false) => format!("{call};"),
    };
    vec![line]
}

fn expects_exception(case: &TestCase) -> bool {
    case.expected_result.starts_with("Throws")
}

/// Suffix repeated test names within one class (overloads) with 2, 3, ...
fn dedupe_test_names(cases: &mut [TestCase]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for case in cases {
        let count = seen.entry(case.test_name.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            case.test_name = format!("{}{}", case.test_name, count);
        }
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

pub struct CSharpTestGenerator {
    settings: GeneratorSettings,
    templates: Arc<TemplateRegistry>,
}

impl CSharpTestGenerator {
    pub fn new(config: &GeneratorConfig, templates: Arc<TemplateRegistry>) -> Self {
        Self::with_settings(GeneratorSettings::from_config(config), templates)
    }

    pub fn with_settings(settings: GeneratorSettings, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            settings,
            templates,
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Detected test package, then the framework of existing tests, then the
    /// configured framework, then xUnit.
    pub fn resolve_framework(&self, result: &AnalysisResult) -> TestFramework {
        let detected = result.project_structure.as_ref().and_then(|s| {
            s.nuget
                .test_frameworks
                .iter()
                .find_map(|f| TestFramework::from_kind(&f.kind))
        });
        let existing = result
            .existing_tests
            .as_ref()
            .and_then(|e| e.test_framework.as_deref())
            .and_then(TestFramework::from_kind);
        detected
            .or(existing)
            .or(self.settings.framework)
            .unwrap_or_default()
    }

    fn class_context<'a>(
        &self,
        result: &'a AnalysisResult,
        class: &'a ClassInfo,
        framework: TestFramework,
    ) -> ClassContext<'a> {
        let dependencies: Vec<&DependencyInfo> = if self.settings.generate_mocks {
            result.mockable_dependencies(&class.name).collect()
        } else {
            Vec::new()
        };
        let mocks = dependencies.iter().map(|d| mock_lines(result, d)).collect();
        ClassContext {
            result,
            class,
            framework,
            dependencies,
            mocks,
            can_construct: can_construct(class),
        }
    }

    fn test_name(&self, member: &str, scenario: &str, expected: &str) -> String {
        format!("{}{member}_{scenario}_{expected}", self.settings.test_method_prefix)
    }

    fn should_test_method(&self, ctx: &ClassContext, method: &MethodInfo) -> bool {
        let accessible = match method.access_modifier {
            AccessModifier::Public => true,
            AccessModifier::Internal | AccessModifier::ProtectedInternal => {
                self.settings.include_internal_methods
            }
            AccessModifier::Private | AccessModifier::Protected | AccessModifier::PrivateProtected => {
                self.settings.include_private_methods
            }
        };
        if !accessible {
            debug!("Skipping {} method {}.{}", method.access_modifier, ctx.class.name, method.name);
            return false;
        }
        if method.is_abstract || (!method.is_static && !ctx.can_construct) {
            debug!("Skipping {}.{}: no instance to call it on", ctx.class.name, method.name);
            return false;
        }
        if heuristics::is_test_method(&method.attributes) {
            return false;
        }
        let already_tested = ctx
            .result
            .existing_tests
            .as_ref()
            .is_some_and(|e| e.has_test_for(&ctx.class.name, &method.name));
        if already_tested {
            debug!("Existing test covers {}.{}", ctx.class.name, method.name);
            return false;
        }
        true
    }

    /// Arrange lines and test data for `params` under `input`. Values named
    /// in `overrides` replace the literal table, keyed by parameter index.
    fn arrange(
        &self,
        params: &[ParameterInfo],
        input: Input,
        overrides: &HashMap<usize, String>,
    ) -> (Vec<String>, BTreeMap<String, Value>) {
        let mut lines = Vec::new();
        let mut data = BTreeMap::new();
        for (i, param) in params.iter().enumerate() {
            if param.is_out {
                continue;
            }
            let (line, value) = match input {
                Input::Null(j) if j == i => (
                    format!("{} {} = null;", param.param_type, param.name),
                    "null".to_string(),
                ),
                Input::Zero(j) if j == i => {
                    let value = zero_value(&param.param_type);
                    (format!("var {} = {value};", param.name), value)
                }
                Input::Empty(j) if j == i => (
                    format!("var {} = string.Empty;", param.name),
                    "string.Empty".to_string(),
                ),
                _ => {
                    let value = overrides
                        .get(&i)
                        .cloned()
                        .unwrap_or_else(|| test_value(&param.param_type));
                    (format!("var {} = {value};", param.name), value)
                }
            };
            lines.push(line);
            data.insert(param.name.clone(), Value::String(value));
        }
        (lines, data)
    }

    /// Inputs for the negative scenarios of `params`: nulls first, then
    /// zero and empty edge cases.
    fn negative_inputs(&self, params: &[ParameterInfo]) -> Vec<Input> {
        if !self.settings.generate_negative_tests {
            return Vec::new();
        }
        let mut inputs: Vec<Input> = params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_optional && !p.is_out && heuristics::is_reference_type(&p.param_type))
            .map(|(i, _)| Input::Null(i))
            .collect();
        for (i, param) in params.iter().enumerate().filter(|(_, p)| !p.is_out) {
            if heuristics::is_numeric_type(&param.param_type) {
                inputs.push(Input::Zero(i));
            } else if heuristics::is_string_type(&param.param_type) {
                inputs.push(Input::Empty(i));
            }
        }
        inputs
    }

    fn method_case(
        &self,
        ctx: &ClassContext,
        method: &MethodInfo,
        input: Input,
        completion: bool,
    ) -> TestCase {
        let params = &method.parameters;
        let (scenario, expected, test_type, priority, tag) = match input {
            Input::Null(i) => (
                format!("WithNull{}", pascal_case(&params[i].name)),
                "ThrowsArgumentNullException",
                TestType::Exception,
                1,
                "null-argument",
            ),
            Input::Zero(i) => (
                format!("WithZero{}", pascal_case(&params[i].name)),
                "HandlesEdgeCase",
                TestType::Unit,
                2,
                "edge-case",
            ),
            Input::Empty(i) => (
                format!("WithEmpty{}", pascal_case(&params[i].name)),
                "HandlesEmptyString",
                TestType::Unit,
                2,
                "edge-case",
            ),
            Input::Valid if completion => (
                "WhenOperationCompletesSuccessfully".to_string(),
                "ReturnsCompletedTask",
                TestType::AsyncMethod,
                2,
                "async",
            ),
            Input::Valid => {
                let test_type = if method.is_static {
                    TestType::StaticMethod
                } else if ctx.class.is_controller {
                    TestType::Controller
                } else if ctx.class.is_service {
                    TestType::Service
                } else if ctx.class.is_repository {
                    TestType::Repository
                } else {
                    TestType::Unit
                };
                ("WithValidInput".to_string(), "ReturnsExpectedResult", test_type, 1, "happy-path")
            }
        };

        let is_async = method.is_async && method.return_type.trim() != "void";
        let throws = matches!(input, Input::Null(_));
        let returns_value = has_result(&method.return_type);
        let receiver = if method.is_static { ctx.class.name.as_str() } else { "_sut" };
        let call = format!("{receiver}.{}({})", method.name, call_arguments(params));

        let (arrange_code, test_data) = self.arrange(params, input, &HashMap::new());
        let assertions = if throws {
            vec![ctx.framework.throws(NULL_EXCEPTION, is_async)]
        } else if returns_value {
            vec![ctx.framework.not_null("result")]
        } else {
            Vec::new()
        };

        TestCase {
            test_name: self.test_name(&method.name, &scenario, expected),
            target_method: method.name.clone(),
            target_class: ctx.class.name.clone(),
            scenario,
            expected_result: expected.to_string(),
            test_type,
            framework: ctx.framework.kind().to_string(),
            arrange_code,
            mock_setup: ctx.setups(),
            act_code: act_lines(&call, is_async, throws, returns_value),
            assertions,
            mock_verifications: if throws { Vec::new() } else { ctx.verifications() },
            test_data,
            is_async,
            priority,
            tags: vec![tag.to_string()],
        }
    }

    fn method_tests(&self, ctx: &ClassContext, method: &MethodInfo) -> Vec<TestCase> {
        let mut cases = vec![self.method_case(ctx, method, Input::Valid, false)];
        for input in self.negative_inputs(&method.parameters) {
            cases.push(self.method_case(ctx, method, input, false));
        }
        if method.is_async {
            cases.push(self.method_case(ctx, method, Input::Valid, true));
        }
        cases
    }

    fn constructor_tests(&self, ctx: &ClassContext) -> Vec<TestCase> {
        if ctx.class.is_static || ctx.class.is_abstract {
            return Vec::new();
        }
        let mut cases = Vec::new();
        for ctor in public_constructors(ctx.class) {
            let params = &ctor.parameters;
            // Injected dependencies come from the test class mocks.
            let overrides: HashMap<usize, String> = params
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    ctx.dependency_for(p)
                        .map(|d| (i, format!("{}.Object", mock_field(&d.name))))
                })
                .collect();
            let creation = format!("new {}({})", ctx.class.name, call_arguments(params));

            let mut inputs = vec![Input::Valid];
            if self.settings.generate_negative_tests {
                inputs.extend(
                    params
                        .iter()
                        .enumerate()
                        .filter(|(_, p)| {
                            !p.is_optional && !p.is_out && heuristics::is_reference_type(&p.param_type)
                        })
                        .map(|(i, _)| Input::Null(i)),
                );
            }

            for input in inputs {
                let (scenario, expected, tag) = match input {
                    Input::Null(i) => (
                        format!("WithNull{}", pascal_case(&params[i].name)),
                        "ThrowsArgumentNullException",
                        "null-argument",
                    ),
                    _ if params.is_empty() => {
                        ("WithNoParameters".to_string(), "CreatesInstance", "happy-path")
                    }
                    _ => ("WithValidParameters".to_string(), "CreatesInstance", "happy-path"),
                };
                let throws = matches!(input, Input::Null(_));
                let (arrange_code, test_data) = self.arrange(params, input, &overrides);
                let assertions = if throws {
                    vec![ctx.framework.throws(NULL_EXCEPTION, false)]
                } else {
                    vec![ctx.framework.not_null("result")]
                };
                cases.push(TestCase {
                    test_name: self.test_name("Constructor", &scenario, expected),
                    target_method: "Constructor".to_string(),
                    target_class: ctx.class.name.clone(),
                    scenario,
                    expected_result: expected.to_string(),
                    test_type: TestType::Constructor,
                    framework: ctx.framework.kind().to_string(),
                    arrange_code,
                    act_code: act_lines(&creation, false, throws, true),
                    assertions,
                    test_data,
                    priority: 1,
                    tags: vec![tag.to_string()],
                    ..Default::default()
                });
            }
        }
        cases
    }

    fn property_tests(&self, ctx: &ClassContext) -> Vec<TestCase> {
        let mut cases = Vec::new();
        let testable = ctx.class.properties.iter().filter(|p| {
            p.access_modifier == AccessModifier::Public && p.has_getter && p.has_setter
        });
        for property in testable {
            let receiver = if property.is_static {
                ctx.class.name.as_str()
            } else if ctx.can_construct {
                "_sut"
            } else {
                continue;
            };
            let name = &property.name;
            let value = test_value(&property.property_type);
            let expected_var = format!("expected{name}");
            let actual_var = format!("actual{name}");
            cases.push(TestCase {
                test_name: self.test_name(name, "GetAndSet", "WorkCorrectly"),
                target_method: name.clone(),
                target_class: ctx.class.name.clone(),
                scenario: "GetAndSet".to_string(),
                expected_result: "WorkCorrectly".to_string(),
                test_type: TestType::Property,
                framework: ctx.framework.kind().to_string(),
                arrange_code: vec![format!("var {expected_var} = {value};")],
                act_code: vec![
                    format!("{receiver}.{name} = {expected_var};"),
                    format!("var {actual_var} = {receiver}.{name};"),
                ],
                assertions: vec![ctx.framework.equal(&expected_var, &actual_var)],
                test_data: [(name.clone(), Value::String(value))].into_iter().collect(),
                priority: 2,
                tags: vec!["property".to_string()],
                ..Default::default()
            });
        }
        cases
    }

    fn usings(
        &self,
        result: &AnalysisResult,
        namespace: &str,
        framework: TestFramework,
        any_async: bool,
        controller: bool,
    ) -> Vec<String> {
        let mut usings = vec!["System".to_string()];
        if !namespace.is_empty() {
            usings.push(namespace.to_string());
        }
        usings.push(framework.using_namespace().to_string());
        if any_async {
            usings.push("System.Threading.Tasks".to_string());
        }
        usings.push(MOCK_NAMESPACE.to_string());
        if framework.uses_fluent_assertions() {
            let library = result
                .project_structure
                .as_ref()
                .and_then(|s| s.nuget.assertion_libraries.iter().find(|l| l.kind == "fluentassertions"))
                .map_or("FluentAssertions", |l| l.name.as_str());
            usings.push(library.to_string());
        }
        if controller {
            usings.push("Microsoft.AspNetCore.Mvc".to_string());
        }
        let mut distinct: Vec<String> = Vec::with_capacity(usings.len());
        for using in usings {
            if !distinct.contains(&using) {
                distinct.push(using);
            }
        }
        distinct
    }

    /// Constructor arguments for the system under test, from the public
    /// constructor with the most parameters.
    fn sut_arguments(&self, ctx: &ClassContext) -> String {
        let Some(ctor) = public_constructors(ctx.class)
            .rev()
            .max_by_key(|c| c.parameters.len())
        else {
            return String::new();
        };
        ctor.parameters
            .iter()
            .map(|p| match ctx.dependency_for(p) {
                Some(d) => format!("{}.Object", mock_field(&d.name)),
                None => test_value(&p.param_type),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Data bag for one class block of a test file.
    pub fn build_template_data(
        &self,
        result: &AnalysisResult,
        class: &ClassInfo,
        cases: &[&TestCase],
    ) -> Value {
        let framework = self.resolve_framework(result);
        let ctx = self.class_context(result, class, framework);
        let namespace = if class.namespace.is_empty() {
            result.namespace.as_str()
        } else {
            class.namespace.as_str()
        };
        let test_namespace = if namespace.is_empty() {
            "Tests".to_string()
        } else {
            format!("{namespace}.Tests")
        };
        let any_async = cases.iter().any(|c| c.is_async);

        let dependency_count = ctx.dependencies.len();
        let dependencies: Vec<Value> = ctx
            .dependencies
            .iter()
            .enumerate()
            .map(|(i, d)| {
                json!({
                    "type": d.interface_type.as_deref().unwrap_or(&d.dependency_type),
                    "name": camel_case(&d.name),
                    "hasNext": i + 1 < dependency_count,
                })
            })
            .collect();

        let case_json = |case: &TestCase| {
            let throws = expects_exception(case);
            let exception_type = if throws { NULL_EXCEPTION } else { "" };
            json!({
                "name": case.test_name,
                "scenario": case.scenario,
                "expectedResult": case.expected_result,
                "methodName": case.target_method,
                "isAsync": case.is_async,
                "arrangeCode": case.arrange_code,
                "mockSetup": case.mock_setup,
                "actCode": case.act_code,
                "assertions": case.assertions,
                "mockVerifications": case.mock_verifications,
                "parameters": case.test_data,
                "expectsException": throws,
                "exceptionType": exception_type,
            })
        };

        let mut groups: Vec<(&str, Vec<Value>)> = Vec::new();
        let mut constructors = Vec::new();
        let mut properties = Vec::new();
        for &case in cases {
            match case.test_type {
                TestType::Constructor => constructors.push(case_json(case)),
                TestType::Property => properties.push(json!({
                    "name": case.target_method,
                    "testName": case.test_name,
                    "testValue": case.test_data.get(&case.target_method),
                    "arrangeCode": case.arrange_code,
                    "actCode": case.act_code,
                    "assertions": case.assertions,
                })),
                _ => match groups.iter().position(|(name, _)| *name == case.target_method) {
                    Some(i) => groups[i].1.push(case_json(case)),
                    None => groups.push((case.target_method.as_str(), vec![case_json(case)])),
                },
            }
        }
        let methods: Vec<Value> = groups
            .into_iter()
            .map(|(name, test_cases)| json!({ "name": name, "testCases": test_cases }))
            .collect();

        json!({
            "className": class.name,
            "namespace": namespace,
            "testNamespace": test_namespace,
            "usings": self.usings(result, namespace, framework, any_async, class.is_controller),
            "dependencies": dependencies,
            "hasSut": ctx.can_construct,
            "sutArguments": self.sut_arguments(&ctx),
            "methods": methods,
            "hasConstructors": !constructors.is_empty(),
            "constructors": constructors,
            "hasProperties": !properties.is_empty(),
            "properties": properties,
            "testAttribute": framework.test_attribute(),
            "hasClassAttribute": framework.class_attribute().is_some(),
            "classAttribute": framework.class_attribute().unwrap_or_default(),
            "setupAttribute": framework.setup_attribute(),
            "isXunit": framework == TestFramework::XUnit,
        })
    }

    fn template_name(class: &ClassInfo) -> &'static str {
        if class.is_controller {
            "csharp/controller-test"
        } else if class.is_service {
            "csharp/service-test"
        } else {
            "csharp/unit-test"
        }
    }

    /// Back up and purge the output directory before the first write.
    fn prepare_output_dir(
        &self,
        output_dir: &Path,
        results: &[AnalysisResult],
    ) -> Result<(), GenerationError> {
        let out = canonical(output_dir);
        if results.iter().any(|r| canonical(&r.file_path).starts_with(&out)) {
            return Err(GenerationError::UnsafeOutputDir(output_dir.to_path_buf()));
        }
        if self.settings.create_backups {
            files::backup_output_dir(output_dir)?;
        }
        files::purge_output_dir(output_dir)
    }
}

impl TestGenerator for CSharpTestGenerator {
    fn name(&self) -> &str {
        "C# Test Generator"
    }

    fn can_generate(&self, result: &AnalysisResult) -> bool {
        result.file_type == "csharp" && !result.classes.is_empty()
    }

    fn generate_tests(&self, result: &AnalysisResult) -> Vec<TestCase> {
        let framework = self.resolve_framework(result);
        let mut cases = Vec::new();
        for class in &result.classes {
            if class.is_interface {
                debug!("Skipping interface {}", class.name);
                continue;
            }
            if heuristics::is_test_class(&class.name, &class.attributes) {
                debug!("Skipping test class {}", class.name);
                continue;
            }
            let ctx = self.class_context(result, class, framework);
            let mut class_cases = self.constructor_tests(&ctx);
            for method in &class.methods {
                if self.should_test_method(&ctx, method) {
                    class_cases.extend(self.method_tests(&ctx, method));
                }
            }
            class_cases.extend(self.property_tests(&ctx));
            dedupe_test_names(&mut class_cases);
            cases.extend(class_cases);
        }
        debug!(
            "Generated {} test cases for {}",
            cases.len(),
            result.file_path.display()
        );
        cases
    }

    fn render(&self, result: &AnalysisResult, cases: &[TestCase]) -> Result<String, GenerationError> {
        let mut class_names: Vec<&str> = Vec::new();
        for case in cases {
            if !class_names.contains(&case.target_class.as_str()) {
                class_names.push(&case.target_class);
            }
        }

        let mut blocks = Vec::with_capacity(class_names.len());
        let mut file_usings: Vec<Value> = Vec::new();
        for name in class_names {
            let class = result
                .find_class(name)
                .ok_or_else(|| GenerationError::MissingClass(name.to_string()))?;
            let class_cases: Vec<&TestCase> =
                cases.iter().filter(|c| c.target_class == name).collect();
            let data = self.build_template_data(result, class, &class_cases);
            if let Some(usings) = data["usings"].as_array() {
                for using in usings {
                    if !file_usings.contains(using) {
                        file_usings.push(using.clone());
                    }
                }
            }
            blocks.push((Self::template_name(class), data));
        }

        // Using directives must precede every namespace, so only the first
        // block carries them.
        let mut rendered = Vec::with_capacity(blocks.len());
        for (i, (template, mut data)) in blocks.into_iter().enumerate() {
            data["usings"] = if i == 0 {
                Value::Array(std::mem::take(&mut file_usings))
            } else {
                Value::Array(Vec::new())
            };
            rendered.push(self.templates.render(template, &data)?);
        }
        Ok(rendered.join("\n"))
    }

    fn generate_test_files(
        &self,
        results: &[AnalysisResult],
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<GeneratedTestFile>, GenerationError> {
        let mut pending = Vec::new();
        for result in results {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            let cases = self.generate_tests(result);
            if cases.is_empty() {
                debug!("No test cases for {}", result.file_path.display());
                continue;
            }
            let content = match self.render(result, &cases) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Failed to render tests for {}: {e}", result.file_path.display());
                    continue;
                }
            };
            let file_path =
                files::test_file_path(output_dir, &result.file_path, &self.settings.test_file_naming);
            let is_new_file = !file_path.exists();
            pending.push(GeneratedTestFile {
                file_path,
                source_file_path: result.file_path.clone(),
                content,
                framework: self.resolve_framework(result).kind().to_string(),
                test_cases: cases,
                is_new_file,
                requires_compilation: true,
            });
        }

        if !results.is_empty() {
            self.prepare_output_dir(output_dir, results)?;
        }
        if pending.is_empty() {
            return Ok(pending);
        }

        let mut written = Vec::with_capacity(pending.len());
        for file in pending {
            match files::write_test_file(&file.file_path, &file.content) {
                Ok(()) => {
                    debug!("Wrote {}", file.file_path.display());
                    written.push(file);
                }
                Err(e) => warn!("Skipping test file: {e}"),
            }
        }
        info!(
            "Generated {} test files in {}",
            written.len(),
            output_dir.display()
        );
        Ok(written)
    }
}

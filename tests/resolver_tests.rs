use trellis_expr::schema::object_schema;
use trellis_expr::{
    Expression, Function, FunctionMap, SchemaType, TypeId, UnpackRequirements, Value,
    WorkflowContext,
};

fn test_scope() -> SchemaType {
    SchemaType::Scope(object_schema(
        "root",
        [
            (
                "foo",
                SchemaType::Object(object_schema("foo", [("bar", SchemaType::String)])),
            ),
            (
                "faz",
                SchemaType::map(
                    SchemaType::String,
                    SchemaType::Object(object_schema("faz_values", [])),
                ),
            ),
            ("simple_str", SchemaType::String),
            ("simple_int", SchemaType::Int),
            ("numbers", SchemaType::list(SchemaType::Int)),
        ],
    ))
}

fn no_functions() -> FunctionMap {
    FunctionMap::new()
}

fn context() -> WorkflowContext {
    WorkflowContext::new()
}

fn resolved_type(expression: &str, schema: &SchemaType, functions: &FunctionMap) -> Option<SchemaType> {
    Expression::parse(expression)
        .unwrap()
        .result_type(schema, functions, &context())
        .unwrap_or_else(|e| panic!("type of {:?} failed: {}", expression, e))
}

fn type_error(expression: &str, schema: &SchemaType, functions: &FunctionMap) -> String {
    Expression::parse(expression)
        .unwrap()
        .result_type(schema, functions, &context())
        .expect_err("expected a resolve error")
        .to_string()
}

fn dependency_strings(
    expression: &str,
    schema: &SchemaType,
    functions: &FunctionMap,
    requirements: &UnpackRequirements,
) -> Vec<String> {
    Expression::parse(expression)
        .unwrap()
        .dependencies(schema, functions, &context(), requirements)
        .unwrap_or_else(|e| panic!("dependencies of {:?} failed: {}", expression, e))
        .iter()
        .map(|p| p.to_string())
        .collect()
}

/// The requirements a dependency-graph builder typically uses: data
/// paths only, function roots dropped.
fn data_paths_only() -> UnpackRequirements {
    UnpackRequirements {
        exclude_function_root_paths: true,
        ..Default::default()
    }
}

fn int_in() -> Function {
    Function::new("intIn", vec![SchemaType::Int], None, |_args| Ok(Value::Null))
}

fn identity() -> Function {
    Function::new_dynamic(
        "identity",
        vec![SchemaType::Any],
        |arg_types| match arg_types {
            [only] => Ok(only.clone()),
            _ => Err("incorrect param count".to_string()),
        },
        |mut args| Ok(args.remove(0)),
    )
}

fn to_list() -> Function {
    Function::new_dynamic(
        "toList",
        vec![SchemaType::Any],
        |arg_types| match arg_types {
            [only] => Ok(SchemaType::list(only.clone())),
            _ => Err("incorrect param count".to_string()),
        },
        |mut args| {
            let value = args.remove(0);
            Ok(Value::List(vec![value.clone(), value]))
        },
    )
}

// ============================================================================
// Type resolution
// ============================================================================

#[test]
fn test_object_property_type() {
    let schema = test_scope();
    assert_eq!(
        resolved_type("$.foo.bar", &schema, &no_functions()),
        Some(SchemaType::String)
    );
}

#[test]
fn test_map_type() {
    let schema = test_scope();
    let faz = resolved_type("$.faz", &schema, &no_functions()).unwrap();
    assert_eq!(faz.type_id(), TypeId::Map);
}

#[test]
fn test_map_value_type_via_literal_key() {
    let schema = test_scope();
    let value_type = resolved_type("$.faz[\"abc\"]", &schema, &no_functions()).unwrap();
    assert_eq!(value_type.type_id(), TypeId::Object);
}

#[test]
fn test_map_value_type_via_subexpression_key() {
    let schema = test_scope();
    let value_type = resolved_type("$.faz[$.foo.bar]", &schema, &no_functions()).unwrap();
    assert_eq!(value_type.type_id(), TypeId::Object);
}

#[test]
fn test_list_item_type() {
    let schema = test_scope();
    assert_eq!(
        resolved_type("$.numbers[0]", &schema, &no_functions()),
        Some(SchemaType::Int)
    );
}

#[test]
fn test_literal_type() {
    let schema = test_scope();
    assert_eq!(
        resolved_type("\"test\"", &schema, &no_functions()),
        Some(SchemaType::String)
    );
    assert_eq!(
        resolved_type("5", &schema, &no_functions()),
        Some(SchemaType::Int)
    );
}

#[test]
fn test_any_type_access() {
    let schema = SchemaType::Any;
    assert_eq!(
        resolved_type("$.anything.goes[0]", &schema, &no_functions()),
        Some(SchemaType::Any)
    );
}

#[test]
fn test_unknown_property() {
    let schema = test_scope();
    let message = type_error("$.missing", &schema, &no_functions());
    assert!(message.contains("object root does not have a property named"));
}

#[test]
fn test_identifier_on_scalar() {
    let schema = test_scope();
    let message = type_error("$.simple_int.sub", &schema, &no_functions());
    assert!(message.contains("cannot evaluate expression identifier sub on data type integer"));
}

#[test]
fn test_identifier_on_map_requires_brackets() {
    // Maps are accessed with brackets; dot access reads properties.
    let schema = test_scope();
    let message = type_error("$.faz.foo", &schema, &no_functions());
    assert!(message.contains("cannot evaluate expression identifier foo on data type map"));
}

#[test]
fn test_bracket_on_object_is_rejected() {
    let schema = test_scope();
    let message = type_error("$[\"foo\"]", &schema, &no_functions());
    assert!(message.contains("use dot notation"));

    let message = type_error("$.foo[$.simple_str]", &schema, &no_functions());
    assert!(message.contains("use dot notation"));
}

#[test]
fn test_bracket_on_scalar_is_rejected() {
    let schema = test_scope();
    let message = type_error("$.simple_str[0]", &schema, &no_functions());
    assert!(message.contains("only supported on map, list, and any types"));
}

#[test]
fn test_map_key_type_mismatch() {
    let schema = test_scope();
    let message = type_error("$.faz[5]", &schema, &no_functions());
    assert!(message.contains("'integer' for a map key, 'string' expected"));
}

#[test]
fn test_list_key_type_mismatch() {
    let schema = test_scope();
    let message = type_error("$.numbers[\"first\"]", &schema, &no_functions());
    assert!(message.contains("for a list key, integer expected"));
}

// ============================================================================
// Operator typing
// ============================================================================

#[test]
fn test_arithmetic_types() {
    let schema = test_scope();
    assert_eq!(resolved_type("5 + 5", &schema, &no_functions()), Some(SchemaType::Int));
    assert_eq!(
        resolved_type("5.0 + 5.0", &schema, &no_functions()),
        Some(SchemaType::Float)
    );
    assert_eq!(
        resolved_type("\"a\" + \"b\"", &schema, &no_functions()),
        Some(SchemaType::String)
    );
    assert_eq!(
        resolved_type("$.simple_int * 2", &schema, &no_functions()),
        Some(SchemaType::Int)
    );
}

#[test]
fn test_comparison_and_logic_types() {
    let schema = test_scope();
    assert_eq!(
        resolved_type("5 > 4", &schema, &no_functions()),
        Some(SchemaType::Bool)
    );
    assert_eq!(
        resolved_type("\"a\" < \"b\"", &schema, &no_functions()),
        Some(SchemaType::Bool)
    );
    assert_eq!(
        resolved_type("true == false", &schema, &no_functions()),
        Some(SchemaType::Bool)
    );
    assert_eq!(
        resolved_type("true && false || true", &schema, &no_functions()),
        Some(SchemaType::Bool)
    );
}

#[test]
fn test_unary_types() {
    let schema = test_scope();
    assert_eq!(resolved_type("-5", &schema, &no_functions()), Some(SchemaType::Int));
    assert_eq!(
        resolved_type("-$.simple_int", &schema, &no_functions()),
        Some(SchemaType::Int)
    );
    assert_eq!(
        resolved_type("!true", &schema, &no_functions()),
        Some(SchemaType::Bool)
    );
}

#[test]
fn test_operand_types_must_match_exactly() {
    let schema = test_scope();
    let message = type_error("5 + 5.0", &schema, &no_functions());
    assert!(message.contains("types do not match"));
}

#[test]
fn test_quantity_comparison_on_booleans() {
    let schema = test_scope();
    let message = type_error("true > false", &schema, &no_functions());
    assert!(message.contains("attempted quantity inequality comparison operation"));
}

#[test]
fn test_logic_requires_booleans() {
    let schema = test_scope();
    let message = type_error("0 && 1", &schema, &no_functions());
    assert!(message.contains("non-boolean type"));

    let message = type_error("!5", &schema, &no_functions());
    assert!(message.contains("non-boolean type"));
}

#[test]
fn test_negation_requires_numbers() {
    let schema = test_scope();
    let message = type_error("-\"a\"", &schema, &no_functions());
    assert!(message.contains("non-numeric type"));

    let message = type_error("\"a\" - \"b\"", &schema, &no_functions());
    assert!(message.contains("non-numeric type"));
}

#[test]
fn test_operations_on_containers_are_incompatible() {
    let schema = test_scope();
    let message = type_error("$.faz == $.faz", &schema, &no_functions());
    assert!(message.contains("incompatible type"));
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_object_dependency() {
    let schema = test_scope();
    assert_eq!(
        dependency_strings("$.foo.bar", &schema, &no_functions(), &Default::default()),
        vec!["$.foo.bar"]
    );
}

#[test]
fn test_map_dependency_keeps_or_elides_keys() {
    let schema = test_scope();
    let with_keys = UnpackRequirements {
        include_keys: true,
        ..Default::default()
    };
    assert_eq!(
        dependency_strings("$.faz[\"abc\"]", &schema, &no_functions(), &with_keys),
        vec!["$.faz.abc"]
    );
    assert_eq!(
        dependency_strings("$.faz[\"abc\"]", &schema, &no_functions(), &Default::default()),
        vec!["$.faz"]
    );
}

#[test]
fn test_list_index_dependency() {
    let schema = test_scope();
    let with_keys = UnpackRequirements {
        include_keys: true,
        ..Default::default()
    };
    assert_eq!(
        dependency_strings("$.numbers[0]", &schema, &no_functions(), &with_keys),
        vec!["$.numbers.0"]
    );
}

#[test]
fn test_subexpression_key_is_its_own_dependency() {
    let schema = test_scope();
    assert_eq!(
        dependency_strings(
            "$.faz[$.foo.bar]",
            &schema,
            &no_functions(),
            &Default::default()
        ),
        vec!["$.foo.bar", "$.faz"]
    );
}

#[test]
fn test_literal_has_no_dependencies() {
    let schema = test_scope();
    assert!(dependency_strings("\"test\"", &schema, &no_functions(), &Default::default())
        .is_empty());
    assert!(dependency_strings("5 + 5", &schema, &no_functions(), &Default::default()).is_empty());
}

#[test]
fn test_operator_operands_each_contribute_dependencies() {
    let schema = test_scope();
    assert_eq!(
        dependency_strings(
            "$.simple_int > 5 && $.foo.bar == \"x\"",
            &schema,
            &no_functions(),
            &Default::default()
        ),
        vec!["$.simple_int", "$.foo.bar"]
    );
}

#[test]
fn test_duplicate_dependencies_are_reported_once() {
    let schema = test_scope();
    assert_eq!(
        dependency_strings(
            "$.simple_int + $.simple_int",
            &schema,
            &no_functions(),
            &Default::default()
        ),
        vec!["$.simple_int"]
    );
}

#[test]
fn test_terminal_descent_can_be_cut() {
    let schema = SchemaType::Any;
    let stop = UnpackRequirements {
        stop_at_terminals: true,
        ..Default::default()
    };
    assert_eq!(
        dependency_strings("$.anything.goes", &schema, &no_functions(), &stop),
        vec!["$"]
    );
    assert_eq!(
        dependency_strings("$.anything.goes", &schema, &no_functions(), &Default::default()),
        vec!["$.anything.goes"]
    );
}

#[test]
fn test_data_roots_can_be_excluded() {
    let schema = test_scope();
    let requirements = UnpackRequirements {
        exclude_data_root_paths: true,
        ..Default::default()
    };
    assert!(
        dependency_strings("$.foo.bar", &schema, &no_functions(), &requirements).is_empty()
    );
}

// ============================================================================
// Function resolution
// ============================================================================

#[test]
fn test_void_function() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert(
        "voidFunc".to_string(),
        Function::new("voidFunc", vec![], None, |_args| Ok(Value::Null)),
    );

    let expr = Expression::parse("voidFunc()").unwrap();
    assert_eq!(expr.result_type(&schema, &functions, &context()).unwrap(), None);

    // The call itself is a function-rooted path unless excluded.
    assert_eq!(
        dependency_strings("voidFunc()", &schema, &functions, &Default::default()),
        vec!["voidFunc"]
    );
    assert!(dependency_strings("voidFunc()", &schema, &functions, &data_paths_only()).is_empty());
}

#[test]
fn test_unknown_function() {
    let schema = test_scope();
    let message = type_error("missing()", &schema, &no_functions());
    assert!(message.contains("could not find function"));
}

#[test]
fn test_function_argument_dependencies() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("intIn".to_string(), int_in());

    assert!(dependency_strings("intIn(5)", &schema, &functions, &data_paths_only()).is_empty());
    assert_eq!(
        dependency_strings("intIn($.simple_int)", &schema, &functions, &data_paths_only()),
        vec!["$.simple_int"]
    );
}

#[test]
fn test_multi_argument_dependencies() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert(
        "test".to_string(),
        Function::new(
            "test",
            vec![SchemaType::Int, SchemaType::Int, SchemaType::String],
            None,
            |_args| Ok(Value::Null),
        ),
    );

    assert_eq!(
        dependency_strings(
            "test(5, $.simple_int, $.simple_str)",
            &schema,
            &functions,
            &data_paths_only()
        ),
        vec!["$.simple_int", "$.simple_str"]
    );
}

#[test]
fn test_compound_function_dependencies() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert(
        "intInOut".to_string(),
        Function::new(
            "intInOut",
            vec![SchemaType::Int],
            Some(SchemaType::Int),
            |mut args| Ok(args.remove(0)),
        ),
    );

    assert_eq!(
        dependency_strings(
            "intInOut(intInOut($.simple_int))",
            &schema,
            &functions,
            &data_paths_only()
        ),
        vec!["$.simple_int"]
    );
    // Without exclusion the function roots show up, deduplicated.
    assert_eq!(
        dependency_strings(
            "intInOut(intInOut($.simple_int))",
            &schema,
            &functions,
            &Default::default()
        ),
        vec!["$.simple_int", "intInOut"]
    );
}

#[test]
fn test_function_argument_type_mismatch() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("intIn".to_string(), int_in());

    let message = type_error("intIn(\"wrongType\")", &schema, &functions);
    assert!(message.contains("error while validating arg/param type compatibility"));
    assert!(message.contains("intIn(integer) void"));
}

#[test]
fn test_function_arity_mismatch() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("intIn".to_string(), int_in());

    let message = type_error("intIn(5, 5)", &schema, &functions);
    assert!(message.contains("Expected 1 args, got 2 args"));
    assert!(message.contains("intIn(integer) void"));
}

#[test]
fn test_dynamic_function_typing() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("identity".to_string(), identity());
    functions.insert("intIn".to_string(), int_in());
    functions.insert(
        "strIn".to_string(),
        Function::new("strIn", vec![SchemaType::String], None, |_args| Ok(Value::Null)),
    );

    assert_eq!(
        resolved_type("identity(1)", &schema, &functions),
        Some(SchemaType::Int)
    );
    assert_eq!(
        resolved_type("identity(\"test\")", &schema, &functions),
        Some(SchemaType::String)
    );
    assert_eq!(
        resolved_type("identity($.simple_int)", &schema, &functions),
        Some(SchemaType::Int)
    );
    assert_eq!(
        resolved_type("identity($.simple_str)", &schema, &functions),
        Some(SchemaType::String)
    );

    // Dynamic output types flow into parameter validation.
    assert_eq!(
        resolved_type("intIn(identity(1))", &schema, &functions),
        None
    );
    let message = type_error("strIn(identity(1))", &schema, &functions);
    assert!(message.contains("unsupported data type"));
    let message = type_error("intIn(identity(\"test\"))", &schema, &functions);
    assert!(message.contains("unsupported data type"));
}

#[test]
fn test_dynamic_list_function_typing() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("toList".to_string(), to_list());

    assert_eq!(
        resolved_type("toList(1)", &schema, &functions),
        Some(SchemaType::list(SchemaType::Int))
    );
    assert_eq!(
        resolved_type("toList(\"test\")", &schema, &functions),
        Some(SchemaType::list(SchemaType::String))
    );
    // Function results chain like any other list.
    assert_eq!(
        resolved_type("toList(\"test\")[0]", &schema, &functions),
        Some(SchemaType::String)
    );
}

#[test]
fn test_function_chain_dependencies_are_function_rooted() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert("toList".to_string(), to_list());

    let with_keys = UnpackRequirements {
        include_keys: true,
        ..Default::default()
    };
    assert_eq!(
        dependency_strings("toList(\"test\")[0]", &schema, &functions, &with_keys),
        vec!["toList.0"]
    );
    assert!(
        dependency_strings("toList(\"test\")[0]", &schema, &functions, &data_paths_only())
            .is_empty()
    );
}

#[test]
fn test_void_result_is_not_a_value() {
    let schema = test_scope();
    let mut functions = FunctionMap::new();
    functions.insert(
        "voidFunc".to_string(),
        Function::new("voidFunc", vec![], None, |_args| Ok(Value::Null)),
    );
    let message = type_error("voidFunc() == 5", &schema, &functions);
    assert!(message.contains("void"));
}

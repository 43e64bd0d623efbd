//! Integration tests for the cloudenv macro
//!
//! These tests run whole macro requests through the handler and check the returned fragment.

use serde_json::{json, Value};

use cloudenv_macro::{
    EntryPointMode, LayerConfig, MacroHandler, MacroRequest, TransformError, Transformer,
};

const LAYER_ARM64: &str = "arn:aws:lambda:us-east-1:123456789012:layer:cloudenv-arm64:5";
const LAYER_X86_64: &str = "arn:aws:lambda:us-east-1:123456789012:layer:cloudenv-x86_64:5";
const LAYER_BOOTSTRAP: &str = "arn:aws:lambda:us-east-1:123456789012:layer:cloudenv-bootstrap:2";

const SM_ARN: &str = "arn:aws:secretsmanager:us-east-1:123:secret:x";
const SSM_ARN: &str = "arn:aws:ssm:us-east-1:123:parameter/app/db-url";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn handler_with_mode(mode: EntryPointMode) -> MacroHandler {
    init_tracing();
    let layers = LayerConfig::new(
        Some(LAYER_ARM64.to_string()),
        Some(LAYER_X86_64.to_string()),
        Some(LAYER_BOOTSTRAP.to_string()),
    )
    .unwrap();
    MacroHandler::new(Transformer::new(layers).with_entrypoint_mode(mode))
}

fn handler() -> MacroHandler {
    handler_with_mode(EntryPointMode::Prepend)
}

/// Run a single function through the macro and return its rewritten properties
fn transform_one(props: Value) -> Value {
    let request = MacroRequest::new(
        "request-1",
        json!({"Resources": {"Function": {"Type": "AWS::Serverless::Function", "Properties": props}}}),
    );
    let response = handler().handle(request).unwrap();
    response.fragment["Resources"]["Function"]["Properties"].clone()
}

fn statements(props: &Value) -> Vec<(String, Vec<String>)> {
    props["Policies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|policy| {
            let statement = &policy["Statement"][0];
            assert_eq!(statement["Effect"], "Allow");
            let resources = statement["Resource"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_str().unwrap().to_string())
                .collect();
            (statement["Action"].as_str().unwrap().to_string(), resources)
        })
        .collect()
}

#[test]
fn test_secrets_manager_zip_x86_64() {
    let props = transform_one(json!({
        "Runtime": "nodejs18.x",
        "Handler": "index.handler",
        "Architectures": ["x86_64"],
        "Environment": {"Secrets": {"DB_PW": SM_ARN}}
    }));

    assert_eq!(
        props["Environment"]["Variables"]["DB_PW"],
        "{aws-sm}arn:aws:secretsmanager:us-east-1:123:secret:x"
    );
    assert_eq!(props["Environment"]["Variables"]["AWS_LAMBDA_EXEC_WRAPPER"], "/opt/cloudenv");
    assert!(props["Environment"].get("Secrets").is_none());
    assert_eq!(props["Layers"], json!([LAYER_X86_64]));
    assert_eq!(
        statements(&props),
        vec![("secretsmanager:GetSecretValue".to_string(), vec![SM_ARN.to_string()])]
    );
    assert_eq!(props["Handler"], "index.handler");
}

#[test]
fn test_mixed_services_provided_al2_arm64() {
    let props = transform_one(json!({
        "Runtime": "provided.al2",
        "Architectures": ["arm64"],
        "Environment": {
            "Variables": {"HELLO": "world"},
            "Secrets": {"DB_URL": SSM_ARN, "DB_PW": SM_ARN}
        }
    }));

    assert_eq!(props["Layers"], json!([LAYER_ARM64, LAYER_BOOTSTRAP]));

    let variables = &props["Environment"]["Variables"];
    assert_eq!(variables["HELLO"], "world");
    assert_eq!(variables["DB_URL"], format!("{{aws-ssm}}{SSM_ARN}"));
    assert_eq!(variables["DB_PW"], format!("{{aws-sm}}{SM_ARN}"));

    let mut statements = statements(&props);
    statements.sort();
    assert_eq!(
        statements,
        vec![
            ("secretsmanager:GetSecretValue".to_string(), vec![SM_ARN.to_string()]),
            ("ssm:GetParameters".to_string(), vec![SSM_ARN.to_string()]),
        ]
    );
}

#[test]
fn test_other_package_type_skips_wiring() {
    let props = transform_one(json!({
        "PackageType": "Other",
        "Environment": {"Secrets": {"DB_URL": SSM_ARN}}
    }));

    assert!(props.get("Layers").is_none());
    assert!(props.get("ImageConfig").is_none());
    assert!(props["Environment"]["Variables"].get("AWS_LAMBDA_EXEC_WRAPPER").is_none());
    assert_eq!(props["Environment"]["Variables"]["DB_URL"], format!("{{aws-ssm}}{SSM_ARN}"));
    assert_eq!(
        statements(&props),
        vec![("ssm:GetParameters".to_string(), vec![SSM_ARN.to_string()])]
    );
}

#[test]
fn test_duplicate_arns_granted_once() {
    let other = "arn:aws:ssm:us-east-1:123:parameter/app/other";
    let props = transform_one(json!({
        "Runtime": "python3.12",
        "Policies": [{"Statement": [{"Effect": "Allow", "Action": "s3:GetObject", "Resource": ["*"]}]}],
        "Environment": {"Secrets": {"A": SSM_ARN, "B": SSM_ARN, "C": other}}
    }));

    let statements = statements(&props);
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].0, "s3:GetObject");
    assert_eq!(statements[1].0, "ssm:GetParameters");

    let mut resources = statements[1].1.clone();
    resources.sort();
    assert_eq!(resources, vec![SSM_ARN.to_string(), other.to_string()]);

    let variables = &props["Environment"]["Variables"];
    assert_eq!(variables["A"], variables["B"]);
}

#[test]
fn test_provided_runtime_gets_bootstrap_layer() {
    let props = transform_one(json!({
        "Runtime": "provided",
        "Environment": {"Secrets": {"A": SM_ARN}}
    }));
    assert_eq!(props["Layers"], json!([LAYER_X86_64, LAYER_BOOTSTRAP]));
}

#[test]
fn test_function_without_secrets() {
    let props = transform_one(json!({
        "Runtime": "provided.al2",
        "Architectures": ["arm64"],
        "Environment": {"Secrets": {}}
    }));
    assert_eq!(
        props,
        json!({
            "Runtime": "provided.al2",
            "Architectures": ["arm64"],
            "Environment": {"Variables": {}}
        })
    );
}

#[test]
fn test_image_entrypoint_modes() {
    let props = json!({
        "PackageType": "Image",
        "ImageUri": "123.dkr.ecr.us-east-1.amazonaws.com/app:latest",
        "ImageConfig": {"EntryPoint": ["/app/bin", "serve"]},
        "Environment": {"Secrets": {"A": SM_ARN}}
    });
    let request = MacroRequest::new(
        "request-2",
        json!({"Resources": {"Function": {"Type": "AWS::Serverless::Function", "Properties": props}}}),
    );

    let prepend = handler_with_mode(EntryPointMode::Prepend)
        .handle(request.clone())
        .unwrap();
    let image_config = &prepend.fragment["Resources"]["Function"]["Properties"]["ImageConfig"];
    assert_eq!(image_config["EntryPoint"], json!(["/opt/cloudenv", "/app/bin", "serve"]));

    let legacy = handler_with_mode(EntryPointMode::Legacy).handle(request).unwrap();
    let image_config = &legacy.fragment["Resources"]["Function"]["Properties"]["ImageConfig"];
    assert!(image_config["EntryPoint"].is_null());
}

#[test]
fn test_unknown_service_fails_request() {
    let request = MacroRequest::new(
        "request-3",
        json!({"Resources": {
            "Good": {
                "Type": "AWS::Serverless::Function",
                "Properties": {"Runtime": "nodejs18.x", "Environment": {"Secrets": {"A": SM_ARN}}}
            },
            "Bad": {
                "Type": "AWS::Serverless::Function",
                "Properties": {
                    "Runtime": "nodejs18.x",
                    "Environment": {"Secrets": {"KEY": "arn:aws:kms:us-east-1:123:key/abc"}}
                }
            }
        }}),
    );

    let err = handler().handle(request).unwrap_err();
    assert!(matches!(err, TransformError::InvalidSecretArn { .. }));
    assert_eq!(err.resource(), Some("Bad"));
    assert_eq!(err.arn(), Some("arn:aws:kms:us-east-1:123:key/abc"));
}

#[test]
fn test_non_function_resources_pass_through() {
    let table = json!({
        "Type": "AWS::DynamoDB::Table",
        "Properties": {"Environment": {"Secrets": {"A": "not-an-arn"}}, "BillingMode": "PAY_PER_REQUEST"}
    });
    let request = MacroRequest::new(
        "request-4",
        json!({
            "Transform": "cloudenv",
            "Resources": {"Table": table.clone()}
        }),
    );

    let response = handler().handle(request).unwrap();
    assert_eq!(response.fragment["Resources"]["Table"], table);
    assert_eq!(response.fragment["Transform"], "cloudenv");
}

#[test]
fn test_reapplying_appends_wrapper_again() {
    let request = MacroRequest::new(
        "request-5",
        json!({"Resources": {"Function": {
            "Type": "AWS::Serverless::Function",
            "Properties": {"Runtime": "nodejs18.x", "Environment": {"Secrets": {"A": SM_ARN}}}
        }}}),
    );
    let first = handler().handle(request).unwrap();

    // The output no longer declares Secrets, so a second pass only normalizes.
    let second = handler()
        .handle(MacroRequest::new("request-6", first.fragment.clone()))
        .unwrap();
    assert_eq!(second.fragment, first.fragment);

    // Re-declaring the secrets on the output stacks a second wrapper layer and policy.
    let mut fragment = first.fragment;
    fragment["Resources"]["Function"]["Properties"]["Environment"]["Secrets"] = json!({"A": SM_ARN});
    let third = handler()
        .handle(MacroRequest::new("request-7", fragment))
        .unwrap();
    let props = &third.fragment["Resources"]["Function"]["Properties"];
    assert_eq!(props["Layers"], json!([LAYER_X86_64, LAYER_X86_64]));
    assert_eq!(props["Policies"].as_array().unwrap().len(), 2);
}

#[test]
fn test_intrinsic_architecture_uses_x86_64_layer() {
    let props = transform_one(json!({
        "Runtime": "provided.al2",
        "Architectures": [{"Ref": "Arch"}],
        "Environment": {"Secrets": {"A": SSM_ARN}}
    }));
    assert_eq!(props["Layers"], json!([LAYER_X86_64, LAYER_BOOTSTRAP]));
    assert_eq!(props["Architectures"], json!([{"Ref": "Arch"}]));
}

#[test]
fn test_intrinsic_runtime_skips_bootstrap_layer() {
    let props = transform_one(json!({
        "Runtime": {"Ref": "Runtime"},
        "Architectures": ["arm64"],
        "Environment": {"Secrets": {"A": SSM_ARN}}
    }));
    assert_eq!(props["Layers"], json!([LAYER_ARM64]));
    assert_eq!(props["Environment"]["Variables"]["AWS_LAMBDA_EXEC_WRAPPER"], "/opt/cloudenv");
    assert_eq!(props["Runtime"], json!({"Ref": "Runtime"}));
}

#[test]
fn test_intrinsic_package_type_skips_wiring() {
    let props = transform_one(json!({
        "PackageType": {"Ref": "Pkg"},
        "Environment": {"Secrets": {"A": SSM_ARN}}
    }));
    assert!(props.get("Layers").is_none());
    assert!(props.get("ImageConfig").is_none());
    assert_eq!(props["Environment"]["Variables"]["A"], format!("{{aws-ssm}}{SSM_ARN}"));
    assert_eq!(
        statements(&props),
        vec![("ssm:GetParameters".to_string(), vec![SSM_ARN.to_string()])]
    );
}

use sublink::generator::{clash::ClashProxy, Document};
use sublink::interfaces::{convert, ConvertRequest};
use sublink::models::{ConversionOptions, OutputFormat, SourceKind};
use sublink::parser::explodes::ss::{encode_ss, explode_ss};
use sublink::parser::{subparser, ParseContext};
use sublink::template::TemplateStore;
use sublink::{Node, Settings};

fn text_request(payload: &str, options: ConversionOptions) -> ConvertRequest {
    ConvertRequest {
        source: SourceKind::Text,
        payload: payload.to_string(),
        options,
    }
}

#[test]
fn ss_links_round_trip() {
    let cases = [
        ("aes-256-gcm", "password", "example.com", 443u16),
        ("chacha20-ietf-poly1305", "p@ss:w0rd!", "10.0.0.1", 8388),
        ("aes-128-gcm", "秘密", "node.example.org", 65535),
    ];
    for (cipher, password, server, port) in cases {
        let node = Node::ss("Name With Spaces", server, port, cipher, password);
        let uri = encode_ss(&node).unwrap();
        assert_eq!(explode_ss(&uri).unwrap(), node, "round trip failed for {}", uri);
    }
}

#[test]
fn batch_order_survives_malformed_lines() {
    let payload = [
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@a.example.com:443#First",
        "definitely not a proxy",
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@b.example.com:443#Second",
        "ss://broken",
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@c.example.com:443#Third",
    ]
    .join("\n");

    let batch = subparser::decode(payload.as_bytes(), &ParseContext::default());
    assert_eq!(batch.len(), 5);
    assert_eq!(batch.success_count(), 3);

    let names: Vec<String> = batch.nodes().iter().map(|n| n.name.clone()).collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn single_node_clash_scenario() {
    // One SIP002 link with filtering on and a generous limit produces exactly
    // one proxy entry with the decoded credentials.
    let options = ConversionOptions {
        output_format: OutputFormat::Clash,
        node_limit: Some(5),
        filter_info_nodes: true,
        ..ConversionOptions::default()
    };
    let outcome = convert(
        &text_request(
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#Node1",
            options,
        ),
        &TemplateStore::new(),
        &Settings::default(),
    )
    .await
    .unwrap();

    let Document::Clash(config) = outcome.document else {
        panic!("expected a clash document");
    };
    assert_eq!(config.proxies.len(), 1);
    match &config.proxies[0] {
        ClashProxy::Ss {
            name,
            server,
            port,
            cipher,
            password,
            ..
        } => {
            assert_eq!(name, "Node1");
            assert_eq!(server, "example.com");
            assert_eq!(*port, 443);
            assert_eq!(cipher, "aes-256-gcm");
            assert_eq!(password, "password");
        }
        other => panic!("expected an ss proxy entry, got {:?}", other),
    }
}

#[tokio::test]
async fn mixed_batch_reports_failures_without_aborting() {
    let mut lines: Vec<String> = (0..7)
        .map(|i| {
            format!(
                "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@host{}.example.com:443#N{}",
                i, i
            )
        })
        .collect();
    lines.push("garbage".to_string());
    lines.push("ssr://unsupported".to_string());
    lines.push("ss://!!bad".to_string());

    let options = ConversionOptions {
        filter_info_nodes: false,
        compatible_mode: false,
        ..ConversionOptions::default()
    };
    let outcome = convert(
        &text_request(&lines.join("\n"), options),
        &TemplateStore::new(),
        &Settings::default(),
    )
    .await
    .unwrap();

    assert_eq!(outcome.diagnostics.parse_failures.len(), 3);
    let Document::Clash(config) = outcome.document else {
        panic!("expected a clash document");
    };
    assert_eq!(config.proxies.len(), 7);
}

#[tokio::test]
async fn node_limit_truncates_without_reordering() {
    let payload: String = (0..6)
        .map(|i| {
            format!(
                "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@host{}.example.com:443#N{}",
                i, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let options = ConversionOptions {
        node_limit: Some(3),
        filter_info_nodes: false,
        compatible_mode: false,
        ..ConversionOptions::default()
    };
    let outcome = convert(
        &text_request(&payload, options),
        &TemplateStore::new(),
        &Settings::default(),
    )
    .await
    .unwrap();

    let Document::Clash(config) = outcome.document else {
        panic!("expected a clash document");
    };
    let names: Vec<&str> = config.proxies.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["N0", "N1", "N2"]);
}

#[tokio::test]
async fn conversion_is_deterministic() {
    let payload = [
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@a.example.com:443#Dup",
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@b.example.com:443#Dup",
        "hysteria2://42aca070-49ec-40c3-849f-bddddb2761ff@c.example.com:26500/?insecure=1#HY",
    ]
    .join("\n");

    let options = ConversionOptions::default();
    let first = convert(
        &text_request(&payload, options.clone()),
        &TemplateStore::new(),
        &Settings::default(),
    )
    .await
    .unwrap();
    let second = convert(
        &text_request(&payload, options),
        &TemplateStore::new(),
        &Settings::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        first.document.to_output_string().unwrap(),
        second.document.to_output_string().unwrap()
    );

    // Duplicate names picked up numeric suffixes, and the hysteria2 node was
    // rewritten for compatibility.
    let Document::Clash(config) = first.document else {
        panic!("expected a clash document");
    };
    let names: Vec<&str> = config.proxies.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["Dup", "Dup 1", "HY (VMess compat)"]);
}

#[tokio::test]
async fn file_source_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subscription.txt");
    std::fs::write(
        &path,
        "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#FromFile\n",
    )
    .unwrap();

    let request = ConvertRequest {
        source: SourceKind::File,
        payload: path.to_string_lossy().into_owned(),
        options: ConversionOptions::default(),
    };
    let outcome = convert(&request, &TemplateStore::new(), &Settings::default())
        .await
        .unwrap();

    let Document::Clash(config) = outcome.document else {
        panic!("expected a clash document");
    };
    assert_eq!(config.proxies[0].name(), "FromFile");
}

#[tokio::test]
async fn custom_template_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("lean.yaml"),
        r#"
base:
  port: 7890
  mode: Rule
proxy_groups:
  - name: Pick
    type: select
    proxies: ["DIRECT", "$nodes"]
rules:
  - "MATCH,Pick"
"#,
    )
    .unwrap();
    let templates = TemplateStore::with_custom_dir(dir.path());

    let options = ConversionOptions {
        template: "lean".to_string(),
        ..ConversionOptions::default()
    };
    let outcome = convert(
        &text_request(
            "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:443#Node1",
            options,
        ),
        &templates,
        &Settings::default(),
    )
    .await
    .unwrap();

    let text = outcome.document.to_output_string().unwrap();
    assert!(text.contains("name: Pick"));
    assert!(text.contains("- Node1"));
    assert!(text.contains("MATCH,Pick"));
}

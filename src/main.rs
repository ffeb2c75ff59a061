use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use chrono::Utc;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

use sublink::interfaces::{convert, ConvertRequest};
use sublink::models::{AppState, ConversionOptions, OutputFormat, SourceKind};
use sublink::parser::{node_manip, subparser, ParseContext};
use sublink::settings::{init_settings, DEFAULT_SECRET};
use sublink::template::TemplateStore;
use sublink::utils::http::{fetch_subscription, read_subscription_file};
use sublink::{timed_link, Settings};

/// Convert proxy subscription links between formats and serve signed
/// expiring subscriptions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen address (e.g., 127.0.0.1 or 0.0.0.0)
    #[arg(short, long, value_name = "ADDRESS")]
    address: Option<String>,

    /// Listen port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Subscription URL to load or convert
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Local subscription file to load or convert
    #[arg(long, value_name = "FILE")]
    file: Option<String>,

    /// Output file path for one-shot conversion or timed-link generation
    #[arg(short, long, value_name = "OUTPUT_FILE")]
    output: Option<String>,

    /// Output format: clash or v2ray
    #[arg(short = 'f', long, default_value = "clash")]
    format: String,

    /// Template id (built-in: minimal, standard, advanced)
    #[arg(short, long, default_value = "standard")]
    template: String,

    /// Limit the number of nodes in the output
    #[arg(long, value_name = "COUNT")]
    limit: Option<usize>,

    /// Keep informational entries (traffic and expiry banners)
    #[arg(long)]
    no_filter: bool,

    /// Keep original protocols instead of rewriting unsupported ones
    #[arg(long)]
    no_compatible: bool,

    /// Generate timed links from the given ss:// url or file of links
    #[arg(long)]
    generate_timed: bool,

    /// Timed-link lifetime in hours
    #[arg(long, value_name = "HOURS")]
    expire: Option<u32>,

    /// Start the subscription server even without an output file
    #[arg(long)]
    server: bool,
}

impl Args {
    fn conversion_options(&self) -> Option<ConversionOptions> {
        let output_format = match self.format.to_lowercase().as_str() {
            "clash" => OutputFormat::Clash,
            "v2ray" => OutputFormat::V2ray,
            other => {
                error!("unsupported output format: {}", other);
                return None;
            }
        };
        Some(ConversionOptions {
            output_format,
            template: self.template.clone(),
            node_limit: self.limit,
            filter_info_nodes: !self.no_filter,
            compatible_mode: !self.no_compatible,
            ..ConversionOptions::default()
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize the logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let args = Args::parse();

    // Initialize settings with config file path if provided
    if let Err(e) = init_settings(args.config.as_deref().unwrap_or("")) {
        error!("failed to load configuration: {}", e);
        std::process::exit(1);
    }

    // Override listen settings with command line arguments
    {
        let mut settings = (*Settings::current()).clone();
        if let Some(address) = &args.address {
            settings.listen_address = address.clone();
        }
        if let Some(port) = args.port {
            settings.listen_port = port;
        }
        if let Some(expire) = args.expire {
            settings.default_expire_hours = expire;
        }
        Settings::replace(settings);
    }

    if args.generate_timed {
        generate_timed_links(&args).await;
        return Ok(());
    }

    if args.output.is_some() && !args.server {
        run_conversion(&args).await;
        return Ok(());
    }

    run_server(&args).await
}

/// One-shot conversion: read the source, convert, write the document.
async fn run_conversion(args: &Args) {
    let (source, payload) = match (&args.url, &args.file) {
        (Some(url), _) => (SourceKind::Url, url.clone()),
        (None, Some(file)) => (SourceKind::File, file.clone()),
        (None, None) => {
            error!("-o/--output requires --url or --file");
            std::process::exit(1);
        }
    };
    let Some(options) = args.conversion_options() else {
        std::process::exit(1);
    };
    let output_file = args.output.as_deref().unwrap_or_default();

    let settings = Settings::current();
    let templates = TemplateStore::with_custom_dir(std::path::Path::new(&settings.template_dir));
    let request = ConvertRequest {
        source,
        payload,
        options,
    };

    match convert(&request, &templates, &settings).await {
        Ok(outcome) => {
            let text = match outcome.document.to_output_string() {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to serialize document: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = std::fs::write(output_file, text) {
                error!("failed to write {}: {}", output_file, e);
                std::process::exit(1);
            }
            if !outcome.diagnostics.parse_failures.is_empty() {
                warn!(
                    "{} entries could not be parsed",
                    outcome.diagnostics.parse_failures.len()
                );
            }
            info!("wrote {}", output_file);
        }
        Err(e) => {
            error!("conversion failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Mint timed links for one ss:// url or every ss:// line of a file.
async fn generate_timed_links(args: &Args) {
    let settings = Settings::current();
    let now = Utc::now().timestamp();
    let ttl_hours = settings.default_expire_hours;

    let sources: Vec<String> = if let Some(url) = &args.url {
        vec![url.clone()]
    } else if let Some(file) = &args.file {
        match std::fs::read_to_string(file) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| l.starts_with("ss://"))
                .map(str::to_string)
                .collect(),
            Err(e) => {
                error!("cannot read {}: {}", file, e);
                std::process::exit(1);
            }
        }
    } else {
        error!("--generate-timed requires --url or --file");
        std::process::exit(1);
    };

    let mut links = Vec::new();
    for source in &sources {
        match timed_link::generate_timed_link(source, ttl_hours, settings.secret_key.as_bytes(), now)
        {
            Ok(link) => links.push(link),
            Err(e) => warn!("skipping link: {}", e),
        }
    }
    if links.is_empty() {
        error!("no ss:// links to sign");
        std::process::exit(1);
    }

    info!("generated {} timed links, valid for {} hours", links.len(), ttl_hours);
    match &args.output {
        Some(output_file) => {
            if let Err(e) = std::fs::write(output_file, links.join("\n")) {
                error!("failed to write {}: {}", output_file, e);
                std::process::exit(1);
            }
            info!("wrote {}", output_file);
        }
        None => {
            for link in &links {
                println!("{}", link);
            }
        }
    }
}

/// Start the subscription server, optionally preloading nodes for `/sub`.
async fn run_server(args: &Args) -> std::io::Result<()> {
    let settings = Settings::current();
    if settings.secret_key == DEFAULT_SECRET {
        warn!("secret_key is the built-in default; set one in the config file before sharing links");
    }

    let mut app_state = AppState::new();
    if args.url.is_some() || args.file.is_some() {
        app_state = app_state.with_sub_nodes(load_sub_nodes(args, &settings).await);
    }
    let app_state = Arc::new(app_state);

    let listen_address = format!("{}:{}", settings.listen_address, settings.listen_port);
    info!("sublink starting on {}", listen_address);

    // Log a ready-to-use redemption URL for the loaded nodes.
    if !app_state.sub_nodes.is_empty() {
        let token = timed_link::encode(&timed_link::sign(
            "sub",
            settings.default_expire_hours,
            settings.secret_key.as_bytes(),
            Utc::now().timestamp(),
        ));
        let envelope = token.strip_prefix(timed_link::TIMED_PREFIX).unwrap_or(&token);
        info!(
            "serving {} nodes: http://{}/sub?expire={}&token={}",
            app_state.sub_nodes.len(),
            listen_address,
            settings.default_expire_hours,
            envelope
        );
    }

    let max_concur_threads = settings.max_concur_threads;
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&app_state)))
            .configure(sublink::web_handlers::config)
            // For health check
            .route("/", web::get().to(|| async { "sublink is running!" }))
    })
    .bind(listen_address)?
    .workers(max_concur_threads)
    .run()
    .await
}

/// Fetch and decode the subscription the server will redeem links for.
async fn load_sub_nodes(args: &Args, settings: &Settings) -> Vec<sublink::Node> {
    let raw = match (&args.url, &args.file) {
        (Some(url), _) => {
            fetch_subscription(url, std::time::Duration::from_secs(settings.fetch_timeout)).await
        }
        (_, Some(file)) => read_subscription_file(file).await,
        _ => return Vec::new(),
    };
    let raw = match raw {
        Ok(raw) => raw,
        Err(e) => {
            error!("failed to load subscription: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = ParseContext::new(settings.secret_key.as_bytes().to_vec(), Utc::now().timestamp());
    let batch = subparser::decode(&raw, &ctx);
    if batch.success_count() == 0 {
        error!("no usable nodes in the subscription");
        std::process::exit(1);
    }

    let options = ConversionOptions {
        filter_info_nodes: !args.no_filter,
        compatible_mode: false,
        ..ConversionOptions::default()
    };
    let report = node_manip::apply(batch.nodes(), &options, &settings.info_node_keywords);
    info!(
        "loaded {} nodes ({} informational entries filtered)",
        report.nodes.len(),
        report.info_filtered
    );
    report.nodes
}

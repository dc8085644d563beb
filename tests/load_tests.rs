//! End-to-end tests for loading, merging and processing configuration.

use layerconf::{
    ConfError, ErrorCode, Loader, LoaderRegistry, MapLoader, Processor, ProcessorConfig, Source,
    decode_section,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Loader that always fails.
struct FailingLoader;

impl Loader for FailingLoader {
    fn load(&self, value: &str) -> anyhow::Result<Vec<Value>> {
        anyhow::bail!("something wrong with {}", value)
    }
}

fn sections() -> Value {
    json!({
        "dirs": {
            "myapp": {
                "mediaFormats": ["images", "audio", "video"],
                "pageTitles": {"$ref": "myapp.mediaFormats"},
                "metadata": "foo:$${moo.jar}:bar",
                "dirs": {
                    "rootDir": "/myapp",
                    "templatesDir": "${myapp.dirs.rootDir}/templates",
                    "sessionsDir": "${myapp.dirs.rootDir}/sessions",
                    "mediaDirs": [
                        "${myapp.dirs.rootDir}/media/${myapp.mediaFormats.0}",
                        "${myapp.dirs.rootDir}/media/${myapp.mediaFormats.1}",
                        "${myapp.dirs.rootDir}/media/${myapp.mediaFormats.2}",
                    ],
                },
                "servers": {"$include": "test:servers"},
            },
        },
        "db": {
            "myapp": {
                "db": {
                    "connectors": {
                        "stat": {
                            "host": "stat.mydb.com",
                            "port": 1234,
                            "dbname": "stat",
                            "username": "stat_writer",
                            "password": "stat_writer_pass",
                        },
                        "metrics": {
                            "$underlay": "myapp.db.connectors.stat",
                            "host": "metrics.mydb.com",
                            "port": 4321,
                            "dbname": "metrics",
                            "username": "metrics_writer",
                            "password": "metrics_writer_pass",
                        },
                    },
                },
            },
        },
        "servers": {
            "alpha": {"ip": "10.0.0.1", "dc": "foodc"},
            "beta": {"ip": "10.0.0.2", "dc": "foodc"},
        },
    })
}

fn create_processor() -> Processor {
    Processor::new(
        ProcessorConfig::default()
            .with_loader("test", MapLoader::from_value(sections()))
            .with_loader("broken", FailingLoader),
    )
}

#[test]
fn test_load_full_configuration() {
    let processor = create_processor();

    let sources: Vec<Source> = vec![
        "test:dirs".into(),
        "test:db".into(),
        "test:unknown".into(),
        json!({"myapp": {"db": {"connectors": {"stat": {"host": "localhost", "port": 4321}}}}})
            .into(),
    ];
    let config = processor.load(sources).unwrap().unwrap();

    let expected = json!({
        "myapp": {
            "mediaFormats": ["images", "audio", "video"],
            "pageTitles": ["images", "audio", "video"],
            "metadata": "foo:${moo.jar}:bar",
            "dirs": {
                "rootDir": "/myapp",
                "templatesDir": "/myapp/templates",
                "sessionsDir": "/myapp/sessions",
                "mediaDirs": [
                    "/myapp/media/images",
                    "/myapp/media/audio",
                    "/myapp/media/video",
                ],
            },
            "servers": {
                "alpha": {"ip": "10.0.0.1", "dc": "foodc"},
                "beta": {"ip": "10.0.0.2", "dc": "foodc"},
            },
            "db": {
                "connectors": {
                    "stat": {
                        "host": "localhost",
                        "port": 4321,
                        "dbname": "stat",
                        "username": "stat_writer",
                        "password": "stat_writer_pass",
                    },
                    "metrics": {
                        "host": "metrics.mydb.com",
                        "port": 4321,
                        "dbname": "metrics",
                        "username": "metrics_writer",
                        "password": "metrics_writer_pass",
                    },
                },
            },
        },
    });
    assert_eq!(Value::Object(config), expected);
}

#[test]
fn test_later_sources_win() {
    let processor = create_processor();

    let config = processor
        .load(vec![
            Source::from(json!({"a": 1, "b": {"x": 1, "y": 1}})),
            Source::from(json!({"a": 2, "b": {"y": 2}})),
        ])
        .unwrap()
        .unwrap();
    assert_eq!(Value::Object(config), json!({"a": 2, "b": {"x": 1, "y": 2}}));
}

#[test]
fn test_zero_values_do_not_override() {
    let processor = create_processor();

    let config = processor
        .load(vec![
            Source::from(json!({"n": 5, "s": "set", "list": [1], "flag": true})),
            Source::from(json!({"n": 0, "s": "", "list": [], "flag": false})),
        ])
        .unwrap()
        .unwrap();
    assert_eq!(
        Value::Object(config),
        json!({"n": 5, "s": "set", "list": [1], "flag": true})
    );
}

#[test]
fn test_references_see_merged_tree() {
    let processor = create_processor();

    let config = processor
        .load(vec![
            Source::from(json!({"url": "http://${host}:${port}", "host": "default"})),
            Source::from(json!({"host": "override", "port": 8080})),
        ])
        .unwrap()
        .unwrap();
    assert_eq!(config["url"], json!("http://override:8080"));
}

#[test]
fn test_nothing_loaded_is_none() {
    let processor = create_processor();
    assert!(processor.load(["test:unknown"]).unwrap().is_none());
}

#[test]
fn test_processor_is_reusable() {
    let processor = create_processor();

    let first = processor.load(["test:servers"]).unwrap().unwrap();
    let second = processor.load(["test:servers"]).unwrap().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_process_caller_tree() {
    let processor = create_processor();

    let out = processor
        .process(json!({
            "servers": {"$include": "test:servers"},
            "primary": {"$ref": "servers.alpha.ip"},
        }))
        .unwrap();
    assert_eq!(out["primary"], json!("10.0.0.1"));
}

#[test]
fn test_decode_loaded_section() {
    #[derive(Debug, Deserialize)]
    struct Connector {
        host: String,
        port: u16,
        dbname: String,
    }

    let processor = create_processor();
    let config = processor.load(["test:db"]).unwrap().unwrap();

    let metrics: Connector = decode_section(&config, "myapp.db.connectors.metrics")
        .unwrap()
        .unwrap();
    assert_eq!(metrics.host, "metrics.mydb.com");
    assert_eq!(metrics.port, 4321);
    assert_eq!(metrics.dbname, "metrics");
}

#[test]
fn test_locator_errors() {
    let processor = create_processor();

    let err = processor.load([""]).unwrap_err();
    assert_eq!(err.code, ErrorCode::EmptyLocator);
    assert!(err.to_string().contains("empty configuration locator"));

    for raw in ["foo", ":foo"] {
        let err = processor.load([raw]).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingLoaderName);
        assert!(err.to_string().contains("missing loader name"));
    }

    let err = processor.load(["redis:foo"]).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownLoader);
    assert!(err.to_string().contains("redis"));
}

#[test]
fn test_loader_error_is_passed_through() {
    let processor = create_processor();

    let err: ConfError = processor.load(["broken:data"]).unwrap_err();
    assert_eq!(err.code, ErrorCode::LoaderFailed);
    assert_eq!(err.to_string(), "something wrong with data");
}

#[test]
fn test_loader_error_inside_include() {
    let processor = create_processor();

    let err = processor
        .load(vec![Source::from(json!({"x": {"$include": "broken:inner"}}))])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::LoaderFailed);
}

#[test]
fn test_non_map_root_is_rejected() {
    let processor = create_processor();

    let err = processor.load(vec![Source::from(json!(42))]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRootType);

    let err = processor
        .load(vec![Source::from(json!({"$ref": "x"})), Source::from(json!({"x": [1]}))])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRootType);
}

#[test]
fn test_root_ref_to_absent_is_rejected() {
    let processor = create_processor();

    let err = processor
        .load(vec![Source::from(json!({"$ref": "missing"}))])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRootType);
}

#[test]
fn test_registry_built_explicitly() {
    let mut loaders = LoaderRegistry::new();
    loaders.register("test", MapLoader::from_value(sections()));
    let processor = Processor::new(ProcessorConfig::new(loaders));

    assert_eq!(processor.loaders().names(), ["test"]);
    assert!(processor.load(["test:servers"]).unwrap().is_some());
}

//! End-to-end cache scenarios on the in-memory backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cachehaus::prelude::*;
use cachehaus::type_mapping::QueryFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Student {
    student_id: i64,
    full_name: String,
}

#[derive(Debug, Serialize)]
struct PageRequest {
    page: u32,
    size: u32,
}

impl QueryFilter for PageRequest {}

struct StudentController;

fn roster() -> Vec<Student> {
    vec![
        Student {
            student_id: 1,
            full_name: "An Nguyen".into(),
        },
        Student {
            student_id: 2,
            full_name: "Binh Tran".into(),
        },
    ]
}

fn haus(config: CacheConfig) -> (Arc<MemoryBackend>, CacheHaus) {
    let backend = Arc::new(MemoryBackend::new());
    let haus = CacheHaus::with_backend(backend.clone(), config).expect("valid config");
    (backend, haus)
}

fn eiu() -> CacheConfig {
    CacheConfig::new("memory://".to_string()).with_project_alias("EIU")
}

#[test]
fn test_list_key_without_identifiers() {
    let keys = KeyBuilder::new("eiu");
    assert_eq!(
        keys.build("student", "list", std::iter::empty::<&str>()),
        "eiu:student:list:all"
    );
}

#[test]
fn test_scalar_and_filter_suffixes() {
    let deriver = ParameterKeyDeriver::new();
    let policy = CachePolicy::new("eiu");

    let scalars = Arguments::new().with("id", 42).with("name", "math");
    assert_eq!(deriver.derive(&scalars, &policy).unwrap(), ":id-42:name-math");

    let first = Arguments::new().with_filter("options", &PageRequest { page: 1, size: 20 });
    let second = Arguments::new().with_filter("options", &PageRequest { page: 1, size: 20 });
    let suffix = deriver.derive(&first, &policy).unwrap();
    assert_eq!(suffix.len(), ":dxo:".len() + 12);
    assert_eq!(suffix, deriver.derive(&second, &policy).unwrap());
}

#[tokio::test]
async fn test_read_then_invalidate_cycle() -> anyhow::Result<()> {
    let (backend, haus) = haus(eiu());
    let loads = Arc::new(AtomicUsize::new(0));

    let counter = loads.clone();
    let list = with_cache(
        haus.interceptor(),
        OperationId::of::<StudentController>("list"),
        ReadPolicy::new(),
        move |_: ()| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(roster())
            }
        },
    );
    let update = with_invalidate(
        haus.interceptor(),
        OperationId::of::<StudentController>("update"),
        InvalidatePolicy::new(),
        |args: Arguments| async move { Ok::<_, anyhow::Error>(args.len()) },
    );

    haus.require_manager()?
        .store()
        .set("eiu:course:list:all", &vec!["algebra"], None)
        .await?;

    assert_eq!(list.call(()).await?, roster());
    assert_eq!(list.call(()).await?, roster());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(backend.contains("eiu:student:list:all"));

    update.call(Arguments::new().with("id", 1)).await?;
    assert!(!backend.contains("eiu:student:list:all"));
    assert!(backend.contains("eiu:course:list:all"));

    assert_eq!(list.call(()).await?, roster());
    assert_eq!(loads.load(Ordering::SeqCst), 2);

    let stats = haus.signals().snapshot();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.invalidations, 1);
    Ok(())
}

#[tokio::test]
async fn test_disabled_layer_is_pass_through() -> anyhow::Result<()> {
    let (backend, haus) = haus(eiu().with_enabled(false));
    let loads = AtomicUsize::new(0);
    let counter = &loads;
    let ctx = InvocationContext::new("Student", "list");

    for _ in 0..5 {
        let students: Vec<Student> = haus
            .interceptor()
            .cached(&ReadPolicy::new(), &ctx, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(roster())
            })
            .await?;
        assert_eq!(students, roster());
    }

    assert_eq!(loads.load(Ordering::SeqCst), 5);
    assert_eq!(backend.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_get_or_set_returns_stored_value() -> anyhow::Result<()> {
    let (_, haus) = haus(eiu());
    let manager = haus.require_manager()?;
    let key = haus.key_builder().build("student", "get", [1]);

    let first = manager
        .get_or_set(&key, || async { roster().into_iter().next() }, None)
        .await?;
    let second = manager
        .get_or_set(&key, || async { None::<Student> }, None)
        .await?;

    assert_eq!(first, second);
    assert_eq!(
        manager.store().get(&key).await?.as_deref(),
        Some(r#"{"studentId":1,"fullName":"An Nguyen"}"#)
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ttl_from_config_default() -> anyhow::Result<()> {
    let (backend, haus) = haus(eiu().with_default_duration(3));
    let ctx = InvocationContext::new("Course", "list");

    let _: Vec<Student> = haus
        .interceptor()
        .cached(&ReadPolicy::new(), &ctx, || async { Ok::<_, anyhow::Error>(roster()) })
        .await?;
    assert!(backend.contains("eiu:course:list:all"));

    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(!backend.contains("eiu:course:list:all"));
    Ok(())
}

#[tokio::test]
async fn test_bypass_mode_survives_outage() -> anyhow::Result<()> {
    let (backend, haus) = haus(eiu().with_store_fault_mode(StoreFaultMode::Bypass));
    backend.set_unavailable(true);
    let ctx = InvocationContext::new("Student", "list");

    let students: Vec<Student> = haus
        .interceptor()
        .cached(&ReadPolicy::new(), &ctx, || async { Ok::<_, anyhow::Error>(roster()) })
        .await?;

    assert_eq!(students, roster());
    assert!(haus.health_check().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_shutdown_drains_detached_populates() -> anyhow::Result<()> {
    let (backend, haus) = haus(eiu());
    let policy = ReadPolicy::new().with_populate(PopulateMode::Detached);

    for id in 0..3 {
        let ctx = InvocationContext::new("Student", "get").arg("id", id);
        let _: Student = haus
            .interceptor()
            .cached(&policy, &ctx, || async {
                Ok::<_, anyhow::Error>(roster().remove(0))
            })
            .await?;
    }

    haus.shutdown().await;
    assert_eq!(backend.keys().len(), 3);
    assert_eq!(haus.signals().snapshot().lost_populates(), 0);
    Ok(())
}

#[tokio::test]
async fn test_signals_reach_callbacks() -> anyhow::Result<()> {
    let (_, haus) = haus(eiu());
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = seen.clone();
    haus.signals().add_callback(move |event: &CacheEvent| {
        if let Ok(mut events) = sink.lock() {
            events.push((event.event_type, event.key.clone()));
        }
    });

    let ctx = InvocationContext::new("Student", "get").arg("id", 9);
    for _ in 0..2 {
        let _: i32 = haus
            .interceptor()
            .cached(&ReadPolicy::new(), &ctx, || async { Ok::<_, anyhow::Error>(9) })
            .await?;
    }

    let events = seen.lock().map(|e| e.clone()).unwrap_or_default();
    let kinds: Vec<EventType> = events.iter().map(|(kind, _)| *kind).collect();
    assert_eq!(kinds, vec![EventType::Miss, EventType::Populated, EventType::Hit]);
    assert!(events.iter().all(|(_, key)| key == "eiu:student:get:id-9"));
    Ok(())
}

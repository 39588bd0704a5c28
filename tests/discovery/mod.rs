use fogbeacon::Registration;

use crate::common::client;
use crate::common::new_store;

fn sorted_ports(registrations: Vec<Registration>) -> Vec<u16> {
    let mut ports: Vec<u16> = registrations.into_iter().map(|r| r.port).collect();
    ports.sort_unstable();
    ports
}

#[tokio::test]
async fn test_locate_before_and_after_expose() {
    let store = new_store();
    let web = client(&store, "default", "web", "i0");

    assert!(web.registry().locate("web", None).await.unwrap().is_empty());

    web.registry().expose(12345, None).await.unwrap();
    let located = web.registry().locate("web", None).await.unwrap();
    assert_eq!(located.len(), 1);
    assert_eq!(located[0].port, 12345);
}

#[tokio::test]
async fn test_discovery_across_programs_and_clusters() {
    let store = new_store();
    client(&store, "default", "api", "api-0").registry().expose(7000, None).await.unwrap();
    client(&store, "default", "api", "api-1").registry().expose(7001, None).await.unwrap();
    client(&store, "canary", "api", "api-0").registry().expose(7100, None).await.unwrap();

    let observer = client(&store, "default", "web", "web-0");
    assert_eq!(
        sorted_ports(observer.registry().locate("api", None).await.unwrap()),
        vec![7000, 7001]
    );

    let canary = client(&store, "canary", "web", "web-0");
    assert_eq!(
        sorted_ports(canary.registry().locate("api", None).await.unwrap()),
        vec![7100]
    );
}

#[tokio::test]
async fn test_intent_registrations() {
    let store = new_store();
    let api = client(&store, "default", "api", "api-0");
    api.registry().expose(7000, Some("rpc")).await.unwrap();
    api.registry().expose(9100, Some("metrics")).await.unwrap();

    let rpc = api.registry().locate("api", Some("rpc")).await.unwrap();
    assert_eq!(sorted_ports(rpc), vec![7000]);
}

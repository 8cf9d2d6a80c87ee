#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use palaver_bus::{Bus, DEFAULT_ADDRESS};
    use palaver_core::{PalaverError, State};

    fn ephemeral_bus() -> Bus {
        let state = State::new();
        state.set("bus.address", json!("127.0.0.1:0"));
        Bus::new(state)
    }

    #[test]
    fn test_check_seeds_the_default_address() {
        let state = State::new();
        let bus = Bus::new(state.clone());
        bus.check();
        assert_eq!(state.get_str("bus.address", ""), DEFAULT_ADDRESS);
        assert_eq!(bus.address(), DEFAULT_ADDRESS);
    }

    #[tokio::test]
    async fn test_put_rejects_empty_topics_and_messages() {
        let bus = ephemeral_bus();
        let publisher = bus.publish();

        assert!(matches!(
            publisher.put(&[], &json!({"k": 1})),
            Err(PalaverError::EmptyTopic)
        ));
        assert!(matches!(
            publisher.put(&[""], &json!({"k": 1})),
            Err(PalaverError::EmptyTopic)
        ));
        assert!(matches!(
            publisher.put(&["room-7"], &json!(null)),
            Err(PalaverError::EmptyMessage)
        ));
        assert!(matches!(
            publisher.put(&["room-7"], &json!("")),
            Err(PalaverError::EmptyMessage)
        ));
        assert!(matches!(
            publisher.put(&["room 7"], &json!({"k": 1})),
            Err(PalaverError::InvalidTopic(_))
        ));
    }

    #[tokio::test]
    async fn test_topic_filtering_end_to_end() {
        let bus = ephemeral_bus();
        let mut publisher = bus.publish();
        publisher.bind().await.unwrap();

        // bind() wrote the actual port back, so subscribers find it
        let wanted = bus.subscribe(&["room-7"]).await.unwrap();
        let foreign = bus.subscribe(&["room-8"]).await.unwrap();

        publisher.put(&["room-7"], &json!({"counter": 3})).unwrap();

        let message = tokio::time::timeout(Duration::from_secs(5), wanted.get(true))
            .await
            .expect("blocking get should deliver within the grace period")
            .unwrap();
        assert_eq!(message, Some(json!({"counter": 3})));

        // the other topic never sees the frame
        assert_eq!(foreign.get(false).await.unwrap(), None);

        publisher.stop();
    }

    #[tokio::test]
    async fn test_one_frame_per_topic() {
        let bus = ephemeral_bus();
        let mut publisher = bus.publish();
        publisher.bind().await.unwrap();

        let first = bus.subscribe(&["alpha"]).await.unwrap();
        let second = bus.subscribe(&["beta"]).await.unwrap();

        publisher
            .put(&["alpha", "beta"], &json!({"instruction": "vote"}))
            .unwrap();

        for subscriber in [&first, &second] {
            let message = tokio::time::timeout(Duration::from_secs(5), subscriber.get(true))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(message, Some(json!({"instruction": "vote"})));
        }

        publisher.stop();
    }

    #[tokio::test]
    async fn test_non_blocking_get_returns_none_when_idle() {
        let bus = ephemeral_bus();
        let mut publisher = bus.publish();
        publisher.bind().await.unwrap();

        let subscriber = bus.subscribe(&["quiet-room"]).await.unwrap();
        assert_eq!(subscriber.get(false).await.unwrap(), None);

        publisher.stop();
    }

    #[tokio::test]
    async fn test_blocking_get_fails_once_the_connection_is_gone() {
        let bus = ephemeral_bus();
        let mut publisher = bus.publish();
        publisher.bind().await.unwrap();

        let subscriber = bus.subscribe(&["room-7"]).await.unwrap();
        publisher.stop();

        // rather than hang forever, a dead subscription reports a bus error
        let outcome = tokio::time::timeout(Duration::from_secs(5), subscriber.get(true))
            .await
            .expect("a closed subscription must not hang the caller");
        assert!(matches!(outcome, Err(PalaverError::Bus(_))));
    }

    #[tokio::test]
    async fn test_late_joiner_misses_history() {
        let bus = ephemeral_bus();
        let mut publisher = bus.publish();
        publisher.bind().await.unwrap();

        publisher.put(&["room-7"], &json!({"counter": 1})).unwrap();
        // let the fan-out flush with nobody listening
        tokio::time::sleep(Duration::from_millis(600)).await;

        let late = bus.subscribe(&["room-7"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(late.get(false).await.unwrap(), None);

        publisher.stop();
    }
}

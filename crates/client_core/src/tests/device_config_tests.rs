use super::*;
use crate::test_support::ScriptedDevice;
use fingerprint_device::SimulatedReader;

fn scripted() -> (Arc<ScriptedDevice>, Arc<dyn DeviceGateway>) {
    let scripted = Arc::new(ScriptedDevice::new());
    let device: Arc<dyn DeviceGateway> = scripted.clone();
    (scripted, device)
}

#[test]
fn min_var_track_maps_in_steps_of_500() {
    assert_eq!(MinVar::from_track(2).device_value(), 1000);
    assert_eq!(MinVar::from_track(2).to_wire(), "1000");
    assert_eq!(MinVar::from_device(1000).track(), 2);
    assert_eq!(MinVar::from_device(1499).track(), 2);
    assert_eq!(MinVar::from_device(0).track(), 0);
}

#[test]
fn zero_threshold_is_automatic() {
    assert_eq!(SimilarityThreshold::parse("0"), Ok(SimilarityThreshold::Automatic));
    assert_eq!(
        SimilarityThreshold::parse(" 9000 "),
        Ok(SimilarityThreshold::Fixed(9000))
    );
    assert_eq!(SimilarityThreshold::Automatic.to_wire(), "0");
    assert!(SimilarityThreshold::parse("twelve").is_err());
    assert!(SimilarityThreshold::parse("-5").is_err());
}

#[test]
fn leaving_automatic_mode_restores_manual_default() {
    assert_eq!(
        SimilarityThreshold::with_automatic(false),
        SimilarityThreshold::Fixed(MANUAL_THRESHOLD_DEFAULT)
    );
    assert!(SimilarityThreshold::with_automatic(true).is_automatic());
}

#[test]
fn buzzer_uses_one_and_zero() {
    assert!(buzzer_from_wire("1"));
    assert!(!buzzer_from_wire("0"));
    assert!(!buzzer_from_wire("yes"));
    assert_eq!(buzzer_to_wire(true), "1");
    assert_eq!(buzzer_to_wire(false), "0");
}

#[tokio::test]
async fn restore_defaults_writes_factory_values_in_order() {
    let (scripted, device) = scripted();

    let results = restore_defaults(&device).await;

    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(
        scripted.set_calls(),
        vec![
            (ConfigParam::MinVar, "1000".to_string()),
            (ConfigParam::SimilarityThreshold, "0".to_string()),
            (ConfigParam::BuzzerOn, "1".to_string()),
        ]
    );
}

#[tokio::test]
async fn one_failing_parameter_does_not_block_the_others() {
    let (scripted, device) = scripted();
    scripted.fail_param(ConfigParam::SimilarityThreshold);
    let settings = DeviceSettings {
        min_var: MinVar::from_track(4),
        threshold: SimilarityThreshold::Fixed(15000),
        buzzer: false,
    };

    let results = save_all(&device, &settings).await;

    assert_eq!(scripted.set_calls().len(), 3);
    let failures: Vec<String> = results
        .iter()
        .filter_map(|(_, result)| result.as_ref().err().map(ToString::to_string))
        .collect();
    assert_eq!(
        failures,
        vec![
            "Error setting parameter \"Similarity Threshold\" with value \"15000\": Invalid parameter"
                .to_string()
        ]
    );

    let loaded = load_all(&device).await;
    assert_eq!(loaded.min_var, Some(MinVar::from_track(4)));
    assert_eq!(loaded.buzzer, Some(false));
    assert_eq!(loaded.threshold, None);
    assert_eq!(
        loaded.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["Error getting parameter \"Similarity Threshold\": Invalid parameter".to_string()]
    );
}

#[tokio::test]
async fn garbage_from_the_reader_is_a_get_error() {
    let (scripted, device) = scripted();
    scripted.set_param(ConfigParam::MinVar, "lots");

    let loaded = load_all(&device).await;

    assert_eq!(loaded.min_var, None);
    assert_eq!(loaded.errors.len(), 1);
    assert_eq!(loaded.errors[0].parameter(), ConfigParam::MinVar);
    let merged = loaded.merged_over(DeviceSettings::factory_defaults());
    assert_eq!(merged.min_var, MinVar::from_track(FACTORY_MIN_VAR_TRACK));
    assert!(merged.threshold.is_automatic());
}

#[tokio::test]
async fn simulated_reader_round_trips_saved_settings() {
    let reader = Arc::new(SimulatedReader::new());
    reader.init().expect("init");
    let device: Arc<dyn DeviceGateway> = reader;

    save(&device, ConfigParam::SimilarityThreshold, "12300")
        .await
        .expect("save threshold");
    save(&device, ConfigParam::BuzzerOn, buzzer_to_wire(false))
        .await
        .expect("save buzzer");

    let loaded = load_all(&device).await;
    assert!(loaded.errors.is_empty());
    assert_eq!(loaded.threshold, Some(SimilarityThreshold::Fixed(12300)));
    assert_eq!(loaded.buzzer, Some(false));
    assert_eq!(loaded.min_var, Some(MinVar::from_track(2)));
}

#[tokio::test]
async fn uninitialized_reader_reports_every_parameter() {
    let device: Arc<dyn DeviceGateway> = Arc::new(SimulatedReader::new());

    let loaded = load_all(&device).await;

    assert_eq!(loaded.errors.len(), 3);
    assert!(loaded.min_var.is_none() && loaded.threshold.is_none() && loaded.buzzer.is_none());
    assert!(loaded.errors[0]
        .to_string()
        .ends_with("Reader not initialized"));
}

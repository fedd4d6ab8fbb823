use super::*;
use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn ready_reader() -> SimulatedReader {
    let reader = SimulatedReader::new();
    reader.init().expect("init");
    reader
}

#[test]
fn ret_code_keeps_three_way_status() {
    assert_eq!(RetCode(-3).status(), RetStatus::Error);
    assert_eq!(RetCode::SUCCESS.status(), RetStatus::Success);
    assert_eq!(RetCode(5).status(), RetStatus::Warning);

    let fault = RetCode(-3)
        .check(|code| format!("lookup {code}"))
        .expect_err("negative codes fail");
    assert_eq!(fault.code, RetCode(-3));
    assert_eq!(fault.message, "lookup -3");

    assert_eq!(
        RetCode(5).check(|_| unreachable!("warnings skip lookup")),
        Ok(RetCode(5))
    );
}

#[test]
fn reply_exposes_warning_only_for_positive_codes() {
    assert_eq!(Reply::ok(()).warning(), None);
    assert_eq!(Reply::with_code((), RetCode(2)).warning(), Some(RetCode(2)));
}

#[test]
fn config_params_use_vendor_wire_keys() {
    let keys = [
        ConfigParam::MinVar,
        ConfigParam::SimilarityThreshold,
        ConfigParam::BuzzerOn,
        ConfigParam::TemplateFormat,
    ]
    .map(ConfigParam::key);
    assert_eq!(
        keys,
        ["MIN_VAR", "SIMILIARITY_THRESHOLD", "BUZZER_ON", "TEMPLATE_FORMAT"]
    );
    assert_eq!(ConfigParam::BuzzerOn.to_string(), "Buzzer");
}

#[test]
fn calls_before_init_are_rejected() {
    let reader = SimulatedReader::new();
    let fault = reader.device_info().expect_err("not initialized");
    assert_eq!(fault.code, codes::NOT_INITIALIZED);
    assert_eq!(fault.message, "Reader not initialized");
}

#[test]
fn second_init_is_a_warning() {
    let reader = ready_reader();
    let reply = reader.init().expect("second init");
    assert_eq!(reply.warning(), Some(codes::ALREADY_INITIALIZED));
    assert!(reader.device_info().is_ok());
}

#[test]
fn captured_samples_from_one_finger_merge() {
    let reader = ready_reader();
    reader.place_finger(4);

    let samples: Vec<_> = (0..3)
        .map(|_| reader.capture_image_and_template().expect("capture").value)
        .collect();
    assert!(samples.iter().all(|sample| sample.image.is_complete()));

    let merged = reader
        .merge_templates(
            &samples[0].template,
            &samples[1].template,
            &samples[2].template,
        )
        .expect("merge");
    assert!(!merged.value.is_empty());
}

#[test]
fn third_capture_of_a_fresh_reader_reports_low_quality_warning() {
    let reader = ready_reader();
    reader.capture_image_and_template().expect("first");
    reader.capture_image_and_template().expect("second");
    let third = reader.capture_image_and_template().expect("third");
    assert_eq!(third.warning(), Some(codes::LOW_QUALITY));
    assert!(third.value.quality < 40);
}

#[test]
fn merge_rejects_templates_from_different_fingers() {
    let reader = ready_reader();
    reader.place_finger(1);
    let a = reader.capture_image_and_template().expect("a").value.template;
    let b = reader.capture_image_and_template().expect("b").value.template;
    reader.place_finger(2);
    let c = reader.capture_image_and_template().expect("c").value.template;

    let fault = reader.merge_templates(&a, &b, &c).expect_err("mismatch");
    assert_eq!(fault.code, codes::MERGE_FAILED);
}

#[test]
fn injected_error_aborts_only_the_next_read() {
    let reader = ready_reader();
    reader.inject(codes::CAPTURE_TIMEOUT);

    let fault = reader.capture_image_and_template().expect_err("injected");
    assert_eq!(fault.code, codes::CAPTURE_TIMEOUT);
    assert!(reader.capture_image_and_template().is_ok());
}

#[test]
fn enrolled_finger_is_identified_and_ids_can_be_cleared() {
    let reader = ready_reader();
    reader.place_finger(3);
    reader.capture_and_enroll(42).expect("enroll");

    let duplicate = reader.capture_and_enroll(42).expect_err("duplicate");
    assert_eq!(duplicate.code, codes::ID_ALREADY_EXISTS);
    assert_eq!(reader.template_ids().expect("ids").value, vec![42]);

    let found = reader.capture_and_identify().expect("identify").value;
    assert_eq!(found.id, 42);

    reader.place_finger(8);
    let miss = reader.capture_and_identify().expect_err("unknown finger");
    assert_eq!(miss.code, codes::NOT_IDENTIFIED);

    reader.delete_all_templates().expect("delete");
    assert!(reader.template_ids().expect("ids").value.is_empty());
}

#[test]
fn parameters_are_validated_per_key() {
    let reader = ready_reader();
    assert_eq!(
        reader
            .get_parameter(ConfigParam::SimilarityThreshold)
            .expect("get")
            .value,
        "0"
    );

    reader
        .set_parameter(ConfigParam::MinVar, "1500")
        .expect("set min var");
    assert_eq!(
        reader.get_parameter(ConfigParam::MinVar).expect("get").value,
        "1500"
    );

    let fault = reader
        .set_parameter(ConfigParam::BuzzerOn, "yes")
        .expect_err("buzzer accepts 0/1");
    assert_eq!(fault.code, codes::INVALID_PARAMETER);
}

#[test]
fn firmware_update_requires_an_existing_file() {
    let reader = ready_reader();
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("fingerprint_device_fw_{suffix}.bin"));

    let missing = reader.update_firmware(&path).expect_err("missing");
    assert_eq!(missing.code, codes::INVALID_FILE);

    fs::write(&path, b"firmware").expect("write firmware");
    reader.update_firmware(&path).expect("update");
    assert_eq!(reader.device_info().expect("info").value.version, "sim-1.1.0");

    fs::remove_file(path).expect("cleanup");
}

#[test]
fn unknown_codes_have_a_generic_message() {
    let reader = SimulatedReader::new();
    assert_eq!(reader.error_message(RetCode(-99)), "Unknown error (-99)");
}

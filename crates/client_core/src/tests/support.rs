//! Fakes shared by the unit tests of this crate.

use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use fingerprint_device::{
    CapturedSample, ConfigParam, DeviceFault, DeviceGateway, DeviceInfo, DeviceResult,
    FingerImage, Identification, Reply, RetCode,
};
use shared::{
    domain::{Employee, EmployeeId},
    error::ApiError,
};

use crate::{
    api::ApiClient,
    error::{AuthError, FetchError, SubmitError},
};

pub const TOKEN: &str = "tok-123";

pub fn employees(rows: &[(i64, &str)]) -> Vec<Employee> {
    rows.iter()
        .map(|(id, name)| Employee::new(*id, *name))
        .collect()
}

pub fn fault(code: i32, message: &str) -> DeviceFault {
    DeviceFault {
        code: RetCode(code),
        message: message.to_string(),
    }
}

pub fn sample(template: &str) -> CapturedSample {
    CapturedSample {
        template: template.to_string(),
        image: FingerImage {
            pixels: vec![0; 4],
            width: 2,
            height: 2,
        },
        quality: 80,
    }
}

pub struct FakeApi {
    login_result: Mutex<Result<String, AuthError>>,
    employees: Mutex<Result<Vec<Employee>, FetchError>>,
    register_result: Mutex<Result<(), SubmitError>>,
    list_calls: AtomicUsize,
    login_calls: AtomicUsize,
    registrations: Mutex<Vec<(String, EmployeeId, String)>>,
    list_tokens: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(rows: Vec<Employee>) -> Self {
        Self {
            login_result: Mutex::new(Ok(TOKEN.to_string())),
            employees: Mutex::new(Ok(rows)),
            register_result: Mutex::new(Ok(())),
            list_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            registrations: Mutex::new(Vec::new()),
            list_tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting_login(status: u16) -> Self {
        let api = Self::new(Vec::new());
        api.set_login(Err(AuthError::InvalidCredentials(ApiError::new(
            status,
            "Unauthorized",
        ))));
        api
    }

    pub fn set_login(&self, result: Result<String, AuthError>) {
        *self.login_result.lock().expect("lock") = result;
    }

    pub fn set_employees(&self, result: Result<Vec<Employee>, FetchError>) {
        *self.employees.lock().expect("lock") = result;
    }

    pub fn set_register(&self, result: Result<(), SubmitError>) {
        *self.register_result.lock().expect("lock") = result;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<(String, EmployeeId, String)> {
        self.registrations.lock().expect("lock").clone()
    }

    pub fn list_tokens(&self) -> Vec<String> {
        self.list_tokens.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<String, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login_result.lock().expect("lock").clone()
    }

    async fn list_employees(&self, token: &str) -> Result<Vec<Employee>, FetchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.list_tokens
            .lock()
            .expect("lock")
            .push(token.to_string());
        self.employees.lock().expect("lock").clone()
    }

    async fn register_biometry(
        &self,
        token: &str,
        employee_id: EmployeeId,
        template_b64: &str,
    ) -> Result<(), SubmitError> {
        self.registrations.lock().expect("lock").push((
            token.to_string(),
            employee_id,
            template_b64.to_string(),
        ));
        self.register_result.lock().expect("lock").clone()
    }
}

/// Device whose capture and merge replies are queued by the test.
pub struct ScriptedDevice {
    captures: Mutex<VecDeque<DeviceResult<CapturedSample>>>,
    merge: Mutex<Option<DeviceResult<String>>>,
    capture_calls: AtomicUsize,
    merge_calls: AtomicUsize,
    merged_inputs: Mutex<Vec<[String; 3]>>,
    params: Mutex<BTreeMap<ConfigParam, String>>,
    failing_params: Mutex<HashSet<ConfigParam>>,
    set_calls: Mutex<Vec<(ConfigParam, String)>>,
}

impl Default for ScriptedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDevice {
    pub fn new() -> Self {
        Self {
            captures: Mutex::new(VecDeque::new()),
            merge: Mutex::new(None),
            capture_calls: AtomicUsize::new(0),
            merge_calls: AtomicUsize::new(0),
            merged_inputs: Mutex::new(Vec::new()),
            params: Mutex::new(BTreeMap::from([
                (ConfigParam::MinVar, "1000".to_string()),
                (ConfigParam::SimilarityThreshold, "0".to_string()),
                (ConfigParam::BuzzerOn, "1".to_string()),
            ])),
            failing_params: Mutex::new(HashSet::new()),
            set_calls: Mutex::new(Vec::new()),
        }
    }

    /// Three good captures `T1`, `T2`, `T3` merging into `T123`.
    pub fn happy_path() -> Self {
        let device = Self::new();
        for template in ["T1", "T2", "T3"] {
            device.push_capture(Ok(Reply::ok(sample(template))));
        }
        device.set_merge(Ok(Reply::ok("T123".to_string())));
        device
    }

    pub fn push_capture(&self, reply: DeviceResult<CapturedSample>) {
        self.captures.lock().expect("lock").push_back(reply);
    }

    pub fn set_merge(&self, reply: DeviceResult<String>) {
        *self.merge.lock().expect("lock") = Some(reply);
    }

    pub fn set_param(&self, param: ConfigParam, value: &str) {
        self.params
            .lock()
            .expect("lock")
            .insert(param, value.to_string());
    }

    pub fn fail_param(&self, param: ConfigParam) {
        self.failing_params.lock().expect("lock").insert(param);
    }

    pub fn capture_calls(&self) -> usize {
        self.capture_calls.load(Ordering::SeqCst)
    }

    pub fn merge_calls(&self) -> usize {
        self.merge_calls.load(Ordering::SeqCst)
    }

    pub fn merged_inputs(&self) -> Vec<[String; 3]> {
        self.merged_inputs.lock().expect("lock").clone()
    }

    pub fn set_calls(&self) -> Vec<(ConfigParam, String)> {
        self.set_calls.lock().expect("lock").clone()
    }

    fn param_failure(&self, param: ConfigParam) -> Option<DeviceFault> {
        self.failing_params
            .lock()
            .expect("lock")
            .contains(&param)
            .then(|| fault(-4, "Invalid parameter"))
    }
}

impl DeviceGateway for ScriptedDevice {
    fn init(&self) -> DeviceResult<()> {
        Ok(Reply::ok(()))
    }

    fn terminate(&self) -> DeviceResult<()> {
        Ok(Reply::ok(()))
    }

    fn device_info(&self) -> DeviceResult<DeviceInfo> {
        Ok(Reply::ok(DeviceInfo {
            version: "1.0".into(),
            serial_number: "SN".into(),
            model: "scripted".into(),
        }))
    }

    fn capture_image(&self) -> DeviceResult<FingerImage> {
        Ok(Reply::ok(sample("image").image))
    }

    fn capture_image_and_template(&self) -> DeviceResult<CapturedSample> {
        self.capture_calls.fetch_add(1, Ordering::SeqCst);
        self.captures
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(fault(-3, "Timed out waiting for a finger")))
    }

    fn merge_templates(&self, first: &str, second: &str, third: &str) -> DeviceResult<String> {
        self.merge_calls.fetch_add(1, Ordering::SeqCst);
        self.merged_inputs.lock().expect("lock").push([
            first.to_string(),
            second.to_string(),
            third.to_string(),
        ]);
        self.merge
            .lock()
            .expect("lock")
            .take()
            .unwrap_or_else(|| Err(fault(-8, "Templates could not be merged")))
    }

    fn capture_and_enroll(&self, _id: i64) -> DeviceResult<()> {
        Ok(Reply::ok(()))
    }

    fn capture_and_identify(&self) -> DeviceResult<Identification> {
        Err(fault(-7, "Finger not identified"))
    }

    fn template_ids(&self) -> DeviceResult<Vec<i64>> {
        Ok(Reply::ok(Vec::new()))
    }

    fn delete_all_templates(&self) -> DeviceResult<()> {
        Ok(Reply::ok(()))
    }

    fn get_parameter(&self, param: ConfigParam) -> DeviceResult<String> {
        if let Some(fault) = self.param_failure(param) {
            return Err(fault);
        }
        self.params
            .lock()
            .expect("lock")
            .get(&param)
            .cloned()
            .map(Reply::ok)
            .ok_or_else(|| fault(-4, "Invalid parameter"))
    }

    fn set_parameter(&self, param: ConfigParam, value: &str) -> DeviceResult<()> {
        self.set_calls
            .lock()
            .expect("lock")
            .push((param, value.to_string()));
        if let Some(fault) = self.param_failure(param) {
            return Err(fault);
        }
        self.set_param(param, value);
        Ok(Reply::ok(()))
    }

    fn update_firmware(&self, _path: &Path) -> DeviceResult<()> {
        Ok(Reply::ok(()))
    }

    fn error_message(&self, code: RetCode) -> String {
        format!("scripted error {code}")
    }
}

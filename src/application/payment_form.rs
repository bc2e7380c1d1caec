use crate::domain::application::EnrollmentApplication;
use crate::domain::payment::{PaymentMethod, PaymentSubmission};
use crate::domain::plan::Plan;
use crate::domain::ports::{ClockBox, FileUploader, ProofFile, UploadedFile};
use crate::error::{EnrollmentError, Result};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Largest proof file accepted for upload.
pub const MAX_PROOF_BYTES: usize = 5 * 1024 * 1024;

pub const METHOD_REQUIRED: &str = "Payment method is required";
pub const REFERENCE_REQUIRED: &str = "Payment reference is required";
pub const UPLOAD_FAILED: &str = "Failed to upload payment proof";
pub const PROOF_TOO_LARGE: &str = "Payment proof must be 5 MB or smaller";
pub const PROOF_WRONG_TYPE: &str = "Payment proof must be an image or a PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Method,
    Reference,
    Proof,
    Notes,
}

/// Callbacks supplied by the enrollment flow hosting the form.
pub trait PaymentFormHandler: Send + Sync {
    fn on_submit(&self, submission: PaymentSubmission);
    fn on_back(&self);
}

/// An upload that has been started but not applied to the form yet.
///
/// It owns the file and holds no borrow of the form, so the form stays editable while
/// `run` is awaited.
#[derive(Debug)]
pub struct PendingUpload {
    ticket: u64,
    file: ProofFile,
}

impl PendingUpload {
    pub async fn run(self, uploader: &dyn FileUploader) -> CompletedUpload {
        let result = uploader.upload(self.file).await;
        CompletedUpload {
            ticket: self.ticket,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CompletedUpload {
    ticket: u64,
    result: Result<UploadedFile>,
}

/// Applicant-side form reporting payment of the enrollment fee.
pub struct PaymentForm {
    application: EnrollmentApplication,
    plan: Plan,
    handler: Box<dyn PaymentFormHandler>,
    clock: ClockBox,
    method: Option<PaymentMethod>,
    reference: String,
    proof_url: Option<String>,
    notes: String,
    errors: BTreeMap<FormField, String>,
    uploading: bool,
    upload_ticket: u64,
}

impl PaymentForm {
    pub fn new(
        application: EnrollmentApplication,
        plan: Plan,
        handler: Box<dyn PaymentFormHandler>,
        clock: ClockBox,
    ) -> Self {
        Self {
            application,
            plan,
            handler,
            clock,
            method: None,
            reference: String::new(),
            proof_url: None,
            notes: String::new(),
            errors: BTreeMap::new(),
            uploading: false,
            upload_ticket: 0,
        }
    }

    pub fn application(&self) -> &EnrollmentApplication {
        &self.application
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        self.method
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn proof_url(&self) -> Option<&str> {
        self.proof_url.as_deref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn errors(&self) -> &BTreeMap<FormField, String> {
        &self.errors
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn set_method(&mut self, method: Option<PaymentMethod>) {
        self.method = method;
        self.errors.remove(&FormField::Method);
    }

    pub fn set_reference(&mut self, reference: impl Into<String>) {
        self.reference = reference.into();
        self.errors.remove(&FormField::Reference);
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.errors.remove(&FormField::Notes);
    }

    /// Detaches the current proof.
    pub fn remove_proof(&mut self) {
        self.proof_url = None;
        self.errors.remove(&FormField::Proof);
    }

    /// Checks the file and marks the form as uploading.
    ///
    /// Returns `None` when the file is refused; the reason is recorded as a proof
    /// error. Only the most recently started upload is applied by `finish_upload`.
    pub fn start_upload(&mut self, file: ProofFile) -> Option<PendingUpload> {
        if let Err(message) = check_proof_file(&file) {
            warn!(file = %file.name, reason = message, "proof file refused");
            self.errors.insert(FormField::Proof, message.to_string());
            return None;
        }

        self.upload_ticket += 1;
        self.uploading = true;
        Some(PendingUpload {
            ticket: self.upload_ticket,
            file,
        })
    }

    /// Applies an upload result: on success the proof URL is set, on failure a proof
    /// error is recorded and the proof is left as it was.
    pub fn finish_upload(&mut self, completed: CompletedUpload) {
        if completed.ticket != self.upload_ticket {
            debug!(ticket = completed.ticket, "ignoring superseded upload");
            return;
        }
        self.uploading = false;

        match completed.result {
            Ok(uploaded) => {
                self.proof_url = Some(uploaded.file_url);
                self.errors.remove(&FormField::Proof);
            }
            Err(err) => {
                warn!(application_id = %self.application.id, error = %err, "proof upload failed");
                self.errors
                    .insert(FormField::Proof, UPLOAD_FAILED.to_string());
            }
        }
    }

    /// Starts, runs and applies an upload in one go.
    pub async fn upload_proof(&mut self, uploader: &dyn FileUploader, file: ProofFile) {
        if let Some(pending) = self.start_upload(file) {
            let completed = pending.run(uploader).await;
            self.finish_upload(completed);
        }
    }

    /// Re-checks every required field from scratch, replacing all previous errors.
    pub fn validate(&mut self) -> bool {
        let mut errors = BTreeMap::new();
        if self.method.is_none() {
            errors.insert(FormField::Method, METHOD_REQUIRED.to_string());
        }
        if self.reference.trim().is_empty() {
            errors.insert(FormField::Reference, REFERENCE_REQUIRED.to_string());
        }
        self.errors = errors;
        self.errors.is_empty()
    }

    /// Validates and, when the form is complete, hands the submission to the handler.
    pub fn submit(&mut self) -> Result<PaymentSubmission> {
        if !self.validate() {
            let fields = self
                .errors
                .keys()
                .map(|field| format!("{field:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(EnrollmentError::ValidationError(format!(
                "missing required fields: {fields}"
            )));
        }
        let method = self.method.ok_or_else(|| {
            EnrollmentError::ValidationError(METHOD_REQUIRED.to_string())
        })?;

        let notes = self.notes.trim();
        let submission = PaymentSubmission {
            method,
            reference: self.reference.trim().to_string(),
            proof_url: self.proof_url.clone(),
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            amount: self.plan.enrollment_fee,
            payment_date: self.clock.now().date_naive(),
        };
        self.handler.on_submit(submission.clone());
        Ok(submission)
    }

    pub fn back(&self) {
        self.handler.on_back();
    }
}

fn check_proof_file(file: &ProofFile) -> std::result::Result<(), &'static str> {
    let content_type = file.content_type.to_ascii_lowercase();
    if !(content_type.starts_with("image/") || content_type == "application/pdf") {
        return Err(PROOF_WRONG_TYPE);
    }
    if file.bytes.len() > MAX_PROOF_BYTES {
        return Err(PROOF_TOO_LARGE);
    }
    Ok(())
}

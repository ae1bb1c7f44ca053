//! Step controller for the multi-screen registration flow.

use shared::protocol::RegisterBody;

pub const REGISTRATION_STEPS: u8 = 4;

/// Field values collected across the registration screens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub email: String,
    pub display_name: String,
    pub phone_number: String,
    pub user_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl From<RegistrationDraft> for RegisterBody {
    fn from(draft: RegistrationDraft) -> Self {
        Self {
            email: draft.email.trim().to_string(),
            display_name: draft.display_name.trim().to_string(),
            phone_number: draft.phone_number.trim().to_string(),
            user_name: draft.user_name,
            password: draft.password,
            confirm_password: draft.confirm_password,
        }
    }
}

/// Bounded step index plus the ordered list of committed drafts.
///
/// The step always stays within `1..=total_steps`: moving past either end is
/// a no-op. Committing never moves the step; callers commit then advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiStepForm<D> {
    step: u8,
    total_steps: u8,
    drafts: Vec<D>,
}

pub type RegistrationFlow = MultiStepForm<RegistrationDraft>;

impl Default for RegistrationFlow {
    fn default() -> Self {
        Self::new(REGISTRATION_STEPS)
    }
}

impl<D> MultiStepForm<D> {
    pub fn new(total_steps: u8) -> Self {
        Self {
            step: 1,
            total_steps: total_steps.max(1),
            drafts: Vec::new(),
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn total_steps(&self) -> u8 {
        self.total_steps
    }

    pub fn is_first_step(&self) -> bool {
        self.step == 1
    }

    pub fn is_last_step(&self) -> bool {
        self.step == self.total_steps
    }

    pub fn next(&mut self) {
        if self.step < self.total_steps {
            self.step += 1;
        }
    }

    pub fn previous(&mut self) {
        if self.step > 1 {
            self.step -= 1;
        }
    }

    pub fn commit_step(&mut self, draft: D) {
        self.drafts.push(draft);
    }

    pub fn drafts(&self) -> &[D] {
        &self.drafts
    }

    pub fn latest_draft(&self) -> Option<&D> {
        self.drafts.last()
    }

    /// Throws away everything collected and returns to the first step.
    pub fn abandon(&mut self) {
        self.step = 1;
        self.drafts.clear();
    }
}

impl RegistrationFlow {
    /// Consumes the flow; the drafts do not outlive it.
    pub fn into_register_body(mut self) -> Option<RegisterBody> {
        self.drafts.pop().map(RegisterBody::from)
    }
}

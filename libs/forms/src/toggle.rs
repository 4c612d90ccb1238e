use snowfinch_model::SensorType;

/// Which sub-form is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveForm {
    #[default]
    QueryActive,
    ReferrerActive,
}

impl From<SensorType> for ActiveForm {
    fn from(ty: SensorType) -> Self {
        match ty {
            SensorType::Query => ActiveForm::QueryActive,
            SensorType::Referrer => ActiveForm::ReferrerActive,
        }
    }
}

impl ActiveForm {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            ActiveForm::QueryActive => SensorType::Query,
            ActiveForm::ReferrerActive => SensorType::Referrer,
        }
    }
}

/// The "Query based" / "Referrer based" switch above the sensor form.
///
/// Only the visible sub-form and the toggle indicator change; field values
/// in the hidden sub-form are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormToggle {
    active: ActiveForm,
}

impl FormToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn showing(ty: SensorType) -> Self {
        Self { active: ty.into() }
    }

    /// Clicks the toggle for `ty`. Returns whether anything changed.
    pub fn toggle(&mut self, ty: SensorType) -> bool {
        let next = ActiveForm::from(ty);
        let changed = next != self.active;
        self.active = next;
        changed
    }

    pub fn active(&self) -> ActiveForm {
        self.active
    }

    pub fn is_visible(&self, ty: SensorType) -> bool {
        self.active.sensor_type() == ty
    }

    /// Whether the toggle control for `ty` carries the `active` class.
    pub fn is_active(&self, ty: SensorType) -> bool {
        self.is_visible(ty)
    }

    pub fn toggle_class(&self, ty: SensorType) -> &'static str {
        if self.is_active(ty) {
            "toggle active"
        } else {
            "toggle"
        }
    }
}

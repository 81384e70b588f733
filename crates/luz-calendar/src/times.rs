use luz_expr::{is_valid_name, NameTable, TimeOfDay, Value};

/// Label of the candle-lighting time in the calendar payload.
pub const ENTRY_LABEL: &str = "כניסת שבת";
/// Label of the end-of-Shabbat time.
pub const EXIT_LABEL: &str = "צאת שבת";
/// Label of the end-of-Shabbat time according to Rabbeinu Tam.
pub const RABBEINU_TAM_LABEL: &str = "צאת שבת ר\"ת";

/// A time entry exactly as the calendar reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedTime {
    pub label: String,
    pub value: String,
}

/// The upcoming Shabbat for one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarTimes {
    pub place: String,
    /// Weekly portion (`parasha`).
    pub portion: String,
    pub entry: TimeOfDay,
    pub exit: TimeOfDay,
    pub rabbeinu_tam: TimeOfDay,
    pub sunset: TimeOfDay,
    /// Every time entry of the payload, in the order the service listed them.
    pub times: Vec<NamedTime>,
}

impl CalendarTimes {
    /// Seed a name table for one fill.
    ///
    /// Fixed English and Hebrew keys are bound first; every reported entry is then added under
    /// [`label_to_name`] unless that name is already taken.
    pub fn to_name_table(&self) -> NameTable {
        let mut names = NameTable::new();

        names.set("parasha", self.portion.as_str());
        names.set("enter_time", self.entry);
        names.set("exit_time", self.exit);
        names.set("rabino_tam", self.rabbeinu_tam);
        names.set("sunset", self.sunset);

        names.set("פרשה", self.portion.as_str());
        names.set("כניסת_שבת", self.entry);
        names.set("צאת_שבת", self.exit);
        names.set("רבינו_תם", self.rabbeinu_tam);
        names.set("שקיעה", self.sunset);

        for time in &self.times {
            let Some(name) = label_to_name(&time.label) else {
                log::debug!("calendar entry `{}` has no usable name; skipped", time.label);
                continue;
            };
            names.set_if_absent(name, Value::infer(&time.value));
        }

        names
    }
}

/// Turn a calendar label into a template name: whitespace runs become `_` and characters that
/// cannot appear in a name are dropped. Returns `None` when nothing usable is left.
pub fn label_to_name(label: &str) -> Option<String> {
    let joined = label.split_whitespace().collect::<Vec<_>>().join("_");
    let name: String = joined
        .chars()
        .filter(|&c| c == '_' || unicode_ident::is_xid_continue(c))
        .collect();
    is_valid_name(&name).then_some(name)
}

/// A prompt with `{{key}}` placeholders.
pub struct PromptTemplate {
    template: &'static str,
}

impl PromptTemplate {
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// Replace every `{{key}}` with its value. Unknown placeholders are left in place.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        vars.iter()
            .fold(self.template.to_string(), |output, (key, value)| {
                output.replace(&format!("{{{{{key}}}}}"), value)
            })
    }
}

use super::*;

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(default)]
    json: bool,

    // report destination, stdout when absent
    #[serde(default)]
    output: Option<String>,
}

impl General {
    pub fn json(&self) -> bool {
        self.json
    }

    pub fn output(&self) -> Option<PathBuf> {
        self.output.as_ref().map(PathBuf::from)
    }
}

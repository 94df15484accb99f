use serde_json::{Map, Value};

use crate::client::Client;
use crate::error::{Error, Result};

/// Identity of a plugin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginAttributes {
    pub name: String,
    pub version: String,
}

impl PluginAttributes {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Bundle of client configuration applied in one call
///
/// A plugin typically registers middleware, codecs or log subscribers.
pub trait Plugin {
    /// Describe the plugin; `None` is rejected
    fn attributes(&self) -> Option<PluginAttributes>;

    /// Apply the plugin to a client
    fn register(&self, client: &mut Client, options: &Value) -> Result<()>;
}

impl Client {
    /// Register a plugin
    ///
    /// The plugin's attributes must carry a name and a version. Missing
    /// options default to an empty object.
    pub fn plugin(&mut self, plugin: &dyn Plugin, options: Option<Value>) -> Result<()> {
        let attributes = plugin
            .attributes()
            .ok_or_else(|| self.named(Error::validation("plugin attributes required")))?;

        if attributes.name.is_empty() {
            return Err(self.named(Error::validation("plugin attributes name required")));
        }
        if attributes.version.is_empty() {
            return Err(self.named(Error::validation("plugin attributes version required")));
        }

        tracing::debug!(plugin = %attributes.name, version = %attributes.version, "registering plugin");

        let options = options.unwrap_or_else(|| Value::Object(Map::new()));
        plugin.register(self, &options)
    }
}

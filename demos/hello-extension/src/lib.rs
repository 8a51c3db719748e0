//! Hello extension - a minimal annex code unit
//!
//! Build it and drop the library into a plugin:
//!
//! ```sh
//! cargo build --release -p hello-extension
//! mkdir -p plugins/hello/extensions/backend/monologue_start
//! cp target/release/libhello_extension.so \
//!    plugins/hello/extensions/backend/monologue_start/_50_hello.so
//! annex extensions dispatch monologue_start
//! ```

use annex_extension_api::{
    Capability, Extension, ExtensionContext, ExtensionError, UnitExport, async_trait, export_unit,
};
use serde_json::Value;

/// Greets once per cycle, counts how often it ran and prepares a greeting
/// in the background under the `greeting` key
#[derive(Default)]
pub struct Hello;

#[async_trait]
impl Extension for Hello {
    async fn execute(&mut self, ctx: &mut ExtensionContext) -> Result<(), ExtensionError> {
        let greetings: u64 = ctx.note_get("greetings").unwrap_or(0) + 1;
        ctx.note_set("greetings", greetings)?;
        ctx.set_temporary_extra("hello", format!("Hello from cycle {}", ctx.cycle()));

        let cycle = ctx.cycle();
        ctx.begin_deferred("greeting", async move {
            Ok(Value::String(format!("Hello from cycle {cycle}")))
        });

        ctx.log_info("said hello");
        Ok(())
    }
}

// The base is listed for illustration; it is never picked as a contribution.
export_unit!(
    UnitExport::base(Capability::EXTENSION),
    UnitExport::extension::<Hello>("Hello"),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_counts_greetings() {
        let mut ctx = ExtensionContext::new("agent-0").with_cycle(2);
        let mut hello = Hello;
        hello.execute(&mut ctx).await.unwrap();
        hello.execute(&mut ctx).await.unwrap();

        assert_eq!(ctx.note_get::<u64>("greetings"), Some(2));
        assert_eq!(
            ctx.temporary_extras().get("hello").map(String::as_str),
            Some("Hello from cycle 2")
        );

        let slot = ctx.deferred().peek("agent-0", "greeting").unwrap();
        assert_eq!(
            slot.handle.wait().await,
            Ok(Value::String("Hello from cycle 2".to_string()))
        );
    }

    #[test]
    fn test_exports_qualify_once() {
        let exports = unsafe { Box::from_raw(_annex_unit_exports()) };
        let qualifying: Vec<_> = exports
            .iter()
            .filter(|e| e.qualifies(Capability::EXTENSION))
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(qualifying, vec!["Hello"]);
        assert_eq!(_annex_unit_api_version(), annex_extension_api::API_VERSION);
    }
}

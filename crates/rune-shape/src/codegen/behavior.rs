use std::fmt::Write as _;

use crate::layout::Layout;
use crate::model::FunctionBinding;

use super::{GenerateOptions, component_id};

/// JSON string literal, which is also a valid JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn handler_body(binding: &FunctionBinding) -> Option<&'static str> {
    let body = match binding {
        FunctionBinding::RenderProperties => {
            "function (el) {\n      const rect = el.getBoundingClientRect();\n      showOverlay('Properties', {\n        id: el.id,\n        label: el.getAttribute('aria-label'),\n        function: el.dataset.function,\n        width: Math.round(rect.width),\n        height: Math.round(rect.height),\n      });\n    }"
        }
        FunctionBinding::ShowStatus => {
            "function (el) {\n      showOverlay('Status', { component: el.id, document: document.readyState });\n    }"
        }
        FunctionBinding::SaveState => {
            "function (el) {\n      document.dispatchEvent(new CustomEvent('rune:save', { detail: { component: el.id } }));\n    }"
        }
        FunctionBinding::LoadState => {
            "function (el) {\n      document.dispatchEvent(new CustomEvent('rune:load', { detail: { component: el.id } }));\n    }"
        }
        FunctionBinding::Custom(_) => return None,
    };
    Some(body)
}

const RUNTIME: &str = r#"
  function showOverlay(title, details) {
    let overlay = document.getElementById('rune-overlay');
    if (!overlay) {
      overlay = document.createElement('pre');
      overlay.id = 'rune-overlay';
      overlay.addEventListener('click', function () { overlay.remove(); });
      document.body.appendChild(overlay);
    }
    overlay.textContent = title + '\n' + JSON.stringify(details, null, 2);
  }

  function dispatch(componentId, event) {
    const name = bindings[componentId];
    const handler = handlers[name];
    if (typeof handler !== 'function') {
      console.warn('Unknown function binding "' + name + '" on #' + componentId);
      return;
    }
    handler(document.getElementById(componentId), event);
  }

  function attach() {
    Object.keys(bindings).forEach(function (componentId) {
      const el = document.getElementById(componentId);
      if (!el) {
        console.warn('No element for function binding #' + componentId);
        return;
      }
      el.addEventListener('click', function (event) { dispatch(componentId, event); });
    });
  }

  if (document.readyState === 'loading') {
    document.addEventListener('DOMContentLoaded', attach);
  } else {
    attach();
  }
"#;

/// Lookup table `componentId -> functionName`, handlers for the known bindings and a
/// click dispatcher per bound component.
pub(super) fn render_behavior(layout: &Layout, options: &GenerateOptions) -> String {
    let mut js = String::new();
    let _ = writeln!(js, "// Function bindings for {}", options.title.replace('\n', " "));
    js.push_str("(function () {\n  'use strict';\n\n  const bindings = {\n");
    for (id, binding) in &layout.functions {
        let _ = writeln!(
            js,
            "    {}: {},",
            js_string(&component_id(id)),
            js_string(binding.name())
        );
    }
    js.push_str("  };\n\n  const handlers = {\n");
    for binding in &FunctionBinding::KNOWN {
        if let Some(body) = handler_body(binding) {
            let _ = writeln!(js, "    {}: {},", binding.name(), body);
        }
    }
    js.push_str("  };\n");
    js.push_str(RUNTIME);
    js.push_str("})();\n");
    js
}

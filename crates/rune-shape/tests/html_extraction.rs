use anyhow::Result;
use rune_shape::{
    ExtractOptions, FunctionBinding, ParseError, ShapeType, Viewport, WarningKind,
    extract_from_markup,
};

const AUTHORED_PAGE: &str = r#"
<!DOCTYPE html>
<html>
  <head>
    <title>Pet dashboard</title>
    <style>
      body { margin: 0; }
      .topbar { display: flex; height: 60px; background-color: rgb(31, 41, 55); }
      .topbar a { padding: 4px; }
      .layout { display: flex; }
      .sidebar { width: 25%; height: 600px; border: 2px solid rgba(0, 0, 0, 0.25); }
      .content { flex: 1; height: 600px; }
      .hidden-note { display: none; }
      @media (max-width: 600px) { .sidebar { display: none; } }
    </style>
  </head>
  <body>
    <nav class="topbar">
      <a href="/">Home</a>
      <a href="/about">About</a>
    </nav>
    <div class="layout">
      <div class="sidebar">Inventory</div>
      <div class="content">
        <h2>Status board</h2>
        <button class="btn-save">Save progress</button>
        <button>Feed</button>
        <p class="hidden-note">Not rendered</p>
      </div>
    </div>
    <script>console.log("ignored");</script>
  </body>
</html>
"#;

fn options() -> ExtractOptions {
    ExtractOptions {
        viewport: Viewport::new(1200, 800),
        preserve_ids: false,
        infer_functions: true,
        stamp_timestamps: false,
    }
}

#[test]
fn authored_page_yields_typed_shapes() -> Result<()> {
    let outcome = extract_from_markup(AUTHORED_PAGE, &[], &options())?;
    let shapes = outcome.value;

    let summary: Vec<(&str, ShapeType)> = shapes.iter().map(|s| (s.id.as_str(), s.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("shape-1", ShapeType::NavigationHorizontal),
            ("shape-2", ShapeType::FunctionSidepanel),
            ("shape-3", ShapeType::Text),
            ("shape-4", ShapeType::Button),
            ("shape-5", ShapeType::Button),
        ]
    );

    let nav = &shapes[0];
    assert_eq!((nav.x, nav.y, nav.width, nav.height), (0, 0, 1200, 60));
    assert_eq!(nav.fill.as_deref(), Some("#1f2937"));
    let links = nav.source_data.as_ref().and_then(|v| v.as_array());
    assert_eq!(links.map(Vec::len), Some(2));

    let sidebar = &shapes[1];
    assert_eq!((sidebar.x, sidebar.y, sidebar.width, sidebar.height), (0, 60, 300, 600));
    assert_eq!(sidebar.border.as_deref(), Some("#00000040"));
    assert_eq!(sidebar.label.as_deref(), Some("Inventory"));

    assert_eq!(shapes[2].label.as_deref(), Some("Status board"));
    assert_eq!(shapes[2].x, 300);
    assert_eq!(shapes[3].function, Some(FunctionBinding::SaveState));
    assert_eq!(shapes[4].function, None);
    Ok(())
}

#[test]
fn skipped_and_uninferred_nodes_are_reported() -> Result<()> {
    let outcome = extract_from_markup(AUTHORED_PAGE, &[], &options())?;
    let kinds: Vec<WarningKind> = outcome.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        vec![WarningKind::FunctionUninferred, WarningKind::SkippedNode]
    );
    assert_eq!(outcome.warnings[0].subject, "shape-5");
    assert_eq!(outcome.warnings[1].subject, "p.hidden-note");
    Ok(())
}

#[test]
fn supplied_stylesheets_apply_after_embedded_ones() -> Result<()> {
    let extra = ".content { height: 300px; } h2 { height: 48px; }".to_string();
    let outcome = extract_from_markup(AUTHORED_PAGE, &[extra], &options())?;
    let heading = outcome
        .value
        .iter()
        .find(|s| s.label.as_deref() == Some("Status board"))
        .expect("heading extracted");
    assert_eq!(heading.height, 48);
    Ok(())
}

#[test]
fn whitespace_document_is_rejected() {
    let err = extract_from_markup(" \n\t ", &[], &options()).expect_err("empty input");
    assert!(matches!(err, ParseError::EmptyDocument));
}

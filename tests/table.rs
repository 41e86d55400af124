use merchant_recon::table::render_table;

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn render_table_aligns_columns() {
    let headers = strings(&["account manager"]);
    let rows = vec![strings(&["All"]), strings(&["Asha"]), strings(&["Ravi"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec!["account manager", "---------------", "All", "Asha", "Ravi"]
    );
}

#[test]
fn render_table_right_aligns_numeric_columns() {
    let headers = strings(&["metric", "value"]);
    let rows = vec![
        strings(&["Sum gmv_current", "1,250"]),
        strings(&["success rate", "0.8788"]),
    ];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[2], "Sum gmv_current   1,250");
    assert_eq!(lines[3], "success rate     0.8788");
}

#[test]
fn render_table_handles_unicode_widths() {
    let headers = strings(&["gérant", "zone"]);
    let rows = vec![strings(&["Zoë", "nord"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "gérant  zone");
    assert_eq!(lines[2], "Zoë     nord");
}

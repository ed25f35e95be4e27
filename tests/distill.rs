//! End-to-end distillation properties on a realistic messy document.

use websift::distill::TRUNCATION_MARKER;
use websift::{analyze_structure, distill, DistillConfig, RemovalCounts};

fn messy_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Widget Review Roundup</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="The year's best widgets, reviewed.">
    <link rel="stylesheet" href="/assets/app.css">
    <link rel="canonical" href="https://reviews.example/widgets">
    <style>.page {{ margin: 0 }}</style>
    <script src="/assets/vendor.js"></script>
</head>
<body>
    <!-- header chrome -->
    <header><nav><a href="/">Home</a><a href="/widgets">Widgets</a></nav></header>
    <div class="advertisement"><iframe src="https://ads.example/slot"></iframe></div>
    <main>
        <article>
            <h1 id="title">Widget Review Roundup</h1>
            <div style="display:none">hidden seo text</div>
            <img src="data:image/png;base64,iVBORw0KGgo=" alt="tracking pixel">
            <img src="/img/widget.jpg" alt="the widget" width="640" loading="lazy">
            <p class="lede" data-section="intro">We tested {count} widgets so you don't have to.</p>
            <svg viewBox="0 0 10 10"><circle r="4"/></svg>
            <p>The <em>standout</em> was the one with the fewest parts.</p>
        </article>
    </main>
    <footer class="social-share-bar"><span>share</span></footer>
    <script>analytics.track("pageview");</script>
    <noscript>Please enable JavaScript.</noscript>
</body>
</html>"#,
        count = 37
    )
}

#[test]
fn distillation_is_deterministic() {
    let page = messy_page();
    let config = DistillConfig::default();
    let first = distill(&page, &config);
    let second = distill(&page, &config);
    assert_eq!(first.cleaned_html, second.cleaned_html);
    assert_eq!(first.removed, second.removed);
    assert_eq!(first.cleaned_size, second.cleaned_size);
}

#[test]
fn cleaned_size_never_exceeds_original() {
    let page = messy_page();
    let result = distill(&page, &DistillConfig::default());
    assert!(result.cleaned_size <= result.original_size);
    assert!(result.compression_ratio > 0.0);
    assert!(result.compression_ratio <= 100.0);
}

#[test]
fn truncated_output_stays_within_budget_plus_marker() {
    let page = messy_page();
    for max in [80, 200, 500] {
        let config = DistillConfig {
            max_length: Some(max),
            ..DistillConfig::default()
        };
        let result = distill(&page, &config);
        assert!(
            result.cleaned_size <= max + TRUNCATION_MARKER.len(),
            "budget {max} exceeded: {}",
            result.cleaned_size
        );
        assert!(result.cleaned_html.ends_with(TRUNCATION_MARKER));
    }
}

#[test]
fn fragment_input_never_grows() {
    let fragment = r#"<article><h2>t</h2><p>body text</p><script>x()</script></article>"#;
    let result = distill(fragment, &DistillConfig::default());
    assert!(result.cleaned_size <= result.original_size);
    assert!(!result.cleaned_html.contains("<html"));
    assert!(!result.cleaned_html.contains("<body"));
    assert!(result.cleaned_html.contains("<article>"));
    assert!(result.cleaned_html.contains("body text"));
}

#[test]
fn distillation_reaches_a_fixed_point() {
    let page = messy_page();
    let config = DistillConfig::default();
    let first = distill(&page, &config);

    // The canonical link survived the first pass but lost its rel
    // attribute to filtering there, so a second pass sweeps it. Every
    // category already at zero stays at zero.
    let second = distill(&first.cleaned_html, &config);
    assert_eq!(
        second.removed,
        RemovalCounts {
            styles: 1,
            ..RemovalCounts::default()
        }
    );

    let third = distill(&second.cleaned_html, &config);
    assert_eq!(third.removed, RemovalCounts::default());
    assert_eq!(third.cleaned_html, second.cleaned_html);
}

#[test]
fn removal_report_matches_the_page() {
    let page = messy_page();
    let result = distill(&page, &DistillConfig::default());

    assert_eq!(result.removed.comments, 1);
    assert_eq!(result.removed.scripts, 3); // 2 scripts + noscript
    assert_eq!(result.removed.styles, 2); // style element + stylesheet link
    assert_eq!(result.removed.meta_tags, 2); // charset + viewport
    assert_eq!(result.removed.svgs, 1);
    assert_eq!(result.removed.data_uri_images, 1);
    assert_eq!(result.removed.hidden_elements, 1);
    assert_eq!(result.removed.ads_trackers, 2); // ad div + social-share footer

    let html = &result.cleaned_html;
    assert!(html.contains("Widget Review Roundup"));
    assert!(html.contains("fewest parts"));
    assert!(html.contains(r#"data-section="intro""#));
    assert!(!html.contains("hidden seo text"));
    assert!(!html.contains("analytics"));
    assert!(!html.contains("ads.example"));
}

#[test]
fn flattened_output_contains_no_markup() {
    let page = messy_page();
    let config = DistillConfig {
        preserve_structure: false,
        ..DistillConfig::default()
    };
    let result = distill(&page, &config);
    assert!(!result.cleaned_html.contains('<'));
    assert!(result.cleaned_html.contains("We tested 37 widgets"));
    assert!(!result.cleaned_html.contains("hidden seo text"));
}

#[test]
fn structure_report_agrees_with_removal_counts() {
    let page = messy_page();
    let report = analyze_structure(&page);
    assert_eq!(report.comments, 1);
    assert_eq!(report.scripts, 2);
    assert_eq!(report.styles, 1);
    assert_eq!(report.svgs, 1);
    assert_eq!(report.images, 2);
    assert_eq!(report.data_uri_images, 1);
    assert_eq!(report.links, 2);
    assert_eq!(report.headings, 1);
    assert!(report.semantic_elements >= 5);
}

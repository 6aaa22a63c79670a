use super::*;
use crate::{
    magic_words::{MagicWordRegistry, fixed_clock},
    resolver::TEMPLATE_NAMESPACE,
    wikicode::builder::*,
};
use time::macros::datetime;

const BASE_DIR: &str = "./src/composer/tests";

macro_rules! corpus_tests {
    ($($name:ident),* $(,)?) => {
        $(#[test]
        fn $name() {
            run_corpus_test(
                stringify!($name),
                include_str!(concat!("./corpus/", stringify!($name), ".json"))
            );
        })*
    }
}

/// A resolver with an empty main namespace and a few templates.
fn resolver() -> ArticleResolver {
    let mut resolver = ArticleResolver::new("/wiki", "/index.php");
    resolver.add_namespace("", [("Main page", document([text("Hello")]))].into_iter().collect());
    resolver.add_namespace(
        "Template",
        [
            ("temp", document([text("This is a test")])),
            ("echo", document([argument("1", None)])),
            ("default", document([argument("1", Some(vec![text("default")]))])),
            (
                "nested default",
                document([argument("2", Some(vec![argument("1", None)]))]),
            ),
            ("loop", document([template("loop", [])])),
            ("ping", document([text("ping "), template("pong", [])])),
            ("pong", document([text("pong "), template("ping", [])])),
            (
                "infobox",
                document([table(
                    vec![],
                    vec![row(vec![cell(vec![argument("1", None)])])],
                )]),
            ),
            (
                "if test",
                document([template("#if:1", [positional(argument("1", None))])]),
            ),
            ("calls echo", document([template("echo", [positional("inner")])])),
        ]
        .into_iter()
        .collect(),
    );
    resolver
}

#[track_caller]
fn compose_with(resolver: &ArticleResolver, options: Options, node: &Node) -> String {
    let _ = env_logger::try_init();
    Composer::with_options(resolver, options)
        .unwrap()
        .compose(node)
        .unwrap()
}

#[track_caller]
fn check(node: Node, expected: &str) {
    assert_eq!(compose_with(&resolver(), Options::default(), &node), expected);
}

/// Asserts that every start tag in the HTML is closed, innermost first.
#[track_caller]
fn assert_balanced(html: &str) {
    static TAG: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)[^>]*?(/?)>").unwrap());

    let mut open = Vec::new();
    for caps in TAG.captures_iter(html) {
        let name = caps[2].to_ascii_lowercase();
        if &caps[1] == "/" {
            assert_eq!(
                open.pop().as_deref(),
                Some(name.as_str()),
                "unexpected </{name}> in {html:?}"
            );
        } else if caps[3].is_empty() && !stack::VOID_TAGS.contains(name.as_str()) {
            open.push(name);
        }
    }
    assert!(open.is_empty(), "unclosed {open:?} in {html:?}");
}

#[track_caller]
fn run_corpus_test(test_name: &str, input: &str) {
    use std::io::Write as _;

    let node = serde_json::from_str::<Node>(input).unwrap();
    let result = compose_with(&resolver(), Options::default(), &node);
    assert_balanced(&result);
    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile(format!("{test_name}.html")).unwrap();
    let _ = writeln!(file, "{result}");
}

corpus_tests! {
    links,
    lists,
    paragraphs,
    preformatted,
    tables,
    templates,
}

#[test]
fn italic() {
    check(
        document([style("''", vec![text("foobar")])]),
        "<p><i>foobar</i></p>",
    );
}

#[test]
fn bold_italic() {
    check(
        document([style("'''", vec![style("''", vec![text("x")])]), text(" y")]),
        "<p><b><i>x</i></b> y</p>",
    );
}

#[test]
fn escaping() {
    check(
        document([text("a < b & c"), comment("gone"), entity("Sigma")]),
        "<p>a &lt; b &amp; c&Sigma;</p>",
    );
}

#[test]
fn unordered_list() {
    check(
        document([list_item("*"), text(" Foobar")]),
        "<ul><li> Foobar</li></ul>",
    );
}

#[test]
fn nested_list() {
    check(
        document([
            list_item("*"),
            text(" Foobar\n"),
            list_item("*"),
            list_item("*"),
            text(" Subitem"),
        ]),
        "<ul><li> Foobar\n</li><ul><li> Subitem</li></ul></ul>",
    );
}

#[test]
fn list_then_paragraph() {
    check(
        document([list_item("*"), text(" a\n\nb")]),
        "<ul><li> a\n\n</li></ul><p>b</p>",
    );
}

#[test]
fn definition_list() {
    check(
        document([list_item(";"), text("term"), list_item(":"), text("def")]),
        "<dl><dt>term</dt><dd>def</dd></dl>",
    );
}

#[test]
fn list_kind_change() {
    check(
        document([list_item("*"), text(" a\n"), list_item("#"), text(" b")]),
        "<ul><li> a\n</li></ul><ol><li> b</li></ol>",
    );
}

#[test]
fn paragraph_breaks() {
    check(document([text("a\n\nb")]), "<p>a\n</p><p>b</p>");
    check(document([text("a\n\n\nb")]), "<p>a\n</p><p><br />\nb</p>");
    check(
        document([text("a\n\n\n\nb")]),
        "<p>a\n</p><p><br />\n</p><p>b</p>",
    );
    check(
        document([text("a\n\n\n\n\nb")]),
        "<p>a\n</p><p><br />\n</p><p><br />\nb</p>",
    );
    check(document([text("a\n\n\n")]), "<p>a\n</p><p><br />\n</p>");
}

#[test]
fn section_heading() {
    check(
        document([text("a"), heading(2, " Title "), text("\nbody")]),
        "<p>a</p><h2> Title </h2>\n<p>body</p>",
    );
}

#[test]
fn html_tags() {
    check(
        document([
            tag("span", vec![attribute("class", Some("x\"y"))], vec![text("a")]),
            void_tag("br", vec![]),
            tag("div", vec![], vec![text("b")]),
        ]),
        r#"<p><span class="x&quot;y">a</span><br /></p><div>b</div>"#,
    );
}

#[test]
fn nowiki_and_pre() {
    check(
        document([tag(
            "nowiki",
            vec![],
            vec![text("''a''"), template("temp", [])],
        )]),
        "<p>''a''{{temp}}</p>",
    );
    check(
        document([tag("pre", vec![], vec![text("a <b>\n\nc")])]),
        "<pre>a <b>\n\nc</pre>",
    );
}

#[test]
fn internal_link() {
    check(
        document([wikilink("Foobar", Some("fuzzbar"))]),
        r#"<p><a href="/wiki/Foobar" title="Foobar">fuzzbar</a></p>"#,
    );
}

#[test]
fn wikilink_namespace() {
    check(
        document([wikilink("template:foo_bar", None)]),
        r#"<p><a href="/wiki/Template:Foo_bar" title="Template:Foo bar">template:foo_bar</a></p>"#,
    );
}

#[test]
fn wikilink_trail() {
    check(
        document([wikilink("Foo", None), text("bar baz")]),
        r#"<p><a href="/wiki/Foo" title="Foo">Foobar</a> baz</p>"#,
    );
}

#[test]
fn custom_link_trail() {
    let node = document([wikilink("Foo", None), text("bär baz")]);
    let options = Options::default().with_link_trail("^[a-zäöü]+");
    assert_eq!(
        compose_with(&resolver(), options, &node),
        r#"<p><a href="/wiki/Foo" title="Foo">Foobär</a> baz</p>"#
    );
}

#[test]
fn bad_link_trail() {
    let resolver = resolver();
    let options = Options::default().with_link_trail("[");
    assert!(matches!(
        Composer::with_options(&resolver, options),
        Err(Error::LinkTrail(_))
    ));
}

#[test]
fn red_links() {
    let options = Options::default().with_red_links(true);
    let node = document([
        wikilink("Foobar", Some("fuzzbar")),
        text(" "),
        wikilink("main page", None),
    ]);
    assert_eq!(
        compose_with(&resolver(), options.clone(), &node),
        r#"<p><a href="/index.php?title=Foobar&amp;action=edit&amp;redlink=1" class="new" title="Foobar (page does not exist)">fuzzbar</a> <a href="/wiki/Main_page" title="Main page">main page</a></p>"#
    );

    let node = document([template("missing", [])]);
    assert_eq!(
        compose_with(&resolver(), options, &node),
        r#"<p><a href="/index.php?title=Template:Missing&amp;action=edit&amp;redlink=1" class="new" title="Template:Missing (page does not exist)">Template:Missing</a></p>"#
    );
}

#[test]
fn external_links() {
    check(
        document([
            external_link("http://example.com", None, false),
            text(" "),
            external_link("http://example.com", Some("Example"), true),
            text(" "),
            external_link("http://example.com", None, true),
        ]),
        concat!(
            r#"<p><a rel="nofollow" class="external free" href="http://example.com">http://example.com</a> "#,
            r#"<a href="http://example.com">Example</a> "#,
            r#"<a href="http://example.com">http://example.com</a></p>"#
        ),
    );
}

#[test]
fn transclusion() {
    check(document([template("temp", [])]), "<p>This is a test</p>");
}

#[test]
fn template_not_found() {
    check(
        document([template("missing", [positional("a<b")])]),
        "<p>{{missing|a&lt;b}}</p>",
    );
}

#[test]
fn template_inline() {
    check(
        document([text("a "), template("temp", []), text(" b")]),
        "<p>a This is a test b</p>",
    );
}

#[test]
fn template_block() {
    check(
        document([text("a"), template("infobox", [positional("x")])]),
        "<p>a</p><table><tr><td>x</td></tr></table>",
    );
}

#[test]
fn template_name_is_composed() {
    check(
        document([template([text("te"), template("echo", [positional("mp")])], [])]),
        "<p>This is a test</p>",
    );
}

#[test]
fn template_loop() {
    let out = compose_with(
        &resolver(),
        Options::default(),
        &document([text("before"), template("loop", [])]),
    );
    assert_eq!(
        out,
        r#"<p><span class="error">Template loop detected: <a href="/wiki/Template:Loop" title="Template:Loop">Template:Loop</a></span></p>"#
    );
}

#[test]
fn indirect_template_loop() {
    let out = compose_with(
        &resolver(),
        Options::default(),
        &document([template("ping", [])]),
    );
    assert!(out.contains("Template loop detected"), "{out}");
    assert!(out.contains("Template:Ping"), "{out}");
}

#[test]
fn open_templates_are_restored() {
    let resolver = resolver();
    let mut composer = Composer::new(&resolver);
    let out = composer.compose(&document([template("loop", [])])).unwrap();
    assert!(out.contains("Template loop detected"));
    assert!(composer.open_templates.is_empty());
    assert_eq!(
        composer.compose(&document([template("temp", [])])).unwrap(),
        "<p>This is a test</p>"
    );
}

#[test]
fn pre_seeded_open_templates() {
    let resolver = resolver();
    let open = [resolver.canonicalize_title("temp", TEMPLATE_NAMESPACE)]
        .into_iter()
        .collect();
    let out = Composer::new(&resolver)
        .with_open_templates(open)
        .compose(&document([template("temp", [])]))
        .unwrap();
    assert!(out.contains("Template loop detected"), "{out}");
}

#[test]
fn arguments() {
    check(
        document([template("echo", [positional("hi")])]),
        "<p>hi</p>",
    );
    check(
        document([template("echo", [positional(" hi ")])]),
        "<p> hi </p>",
    );
    check(
        document([template("echo", [named("1", " hi ")])]),
        "<p>hi</p>",
    );
    check(document([template("echo", [])]), "<p>{{{1}}}</p>");
    check(
        document([template("echo", [positional("a"), named("1", "b")])]),
        "<p>b</p>",
    );
}

#[test]
fn argument_defaults() {
    check(document([template("default", [])]), "<p>default</p>");
    check(
        document([template("default", [positional("given")])]),
        "<p>given</p>",
    );
    // Defaults are composed without the parameters of the call.
    check(
        document([template("nested default", [positional("x")])]),
        "<p>{{{1}}}</p>",
    );
}

#[test]
fn context_is_not_inherited() {
    let resolver = resolver();
    let context = [("1".to_string(), "outer".to_string())].into_iter().collect();
    let out = Composer::new(&resolver)
        .with_context(context)
        .compose(&document([
            argument("1", None),
            text(" "),
            template("calls echo", []),
        ]))
        .unwrap();
    assert_eq!(out, "<p>outer inner</p>");
}

#[test]
fn preview_mode() {
    let options = Options::default().with_expand_templates(false);
    let node = document([template("temp", [positional("a<b")]), argument("1", None)]);
    assert_eq!(
        compose_with(&resolver(), options, &node),
        "<p>{{temp|a&lt;b}}{{{1}}}</p>"
    );
}

#[test]
fn subst() {
    let node = document([template("subst:temp", [])]);
    assert_eq!(
        compose_with(&resolver(), Options::default(), &node),
        "<p>{{subst:temp}}</p>"
    );
    assert_eq!(
        compose_with(&resolver(), Options::default().with_strip_subst(true), &node),
        "<p>This is a test</p>"
    );
    check(document([template("safesubst:temp", [])]), "<p>This is a test</p>");
}

#[test]
fn magic_words() {
    let clock = fixed_clock(datetime!(2001-08-03 09:02:03 UTC));
    let resolver = resolver().with_magic_words(MagicWordRegistry::with_clock(clock));
    let node = document([
        template("CURRENTYEAR", []),
        text("-"),
        template("CURRENTMONTH", []),
        text("-"),
        template("CURRENTDAY2", []),
    ]);
    assert_eq!(
        compose_with(&resolver, Options::default(), &node),
        "<p>2001-08-03</p>"
    );
}

#[test]
fn custom_magic_word() {
    let mut resolver = resolver();
    resolver
        .magic_words_mut()
        .insert("SITENAME", || "Wiki".to_string());
    check_with(&resolver, document([template("SITENAME", [])]), "<p>Wiki</p>");
}

#[track_caller]
fn check_with(resolver: &ArticleResolver, node: Node, expected: &str) {
    assert_eq!(compose_with(resolver, Options::default(), &node), expected);
}

#[test]
fn parser_functions() {
    check(
        document([template("#if: x ", [positional(" yes "), positional(" no ")])]),
        "<p>yes</p>",
    );
    check(
        document([template("#if:", [positional("yes"), positional("no")])]),
        "<p>no</p>",
    );
    check(
        document([template("#foo:bar", [])]),
        "<p>{{#foo:bar}}</p>",
    );
}

#[test]
fn parser_function_sees_caller_context() {
    check(
        document([template("if test", [positional("x")])]),
        "<p>x</p>",
    );
}

#[test]
fn custom_parser_function() {
    let mut resolver = resolver();
    resolver
        .parser_functions_mut()
        .insert("#shout", |argument, _, _| Ok(argument.trim().to_uppercase()));
    check_with(
        &resolver,
        document([template("#shout: hey", [])]),
        "<p>HEY</p>",
    );
}

#[test]
fn custom_parser_function_composes_params() {
    let mut resolver = resolver();
    resolver
        .parser_functions_mut()
        .insert("#first", |_, params, expander| match params.first() {
            Some(param) => expander.expand(&param.value),
            None => Ok(String::new()),
        });
    check_with(
        &resolver,
        document([template("#first", [positional(style("''", vec![text("a")]))])]),
        "<p><i>a</i></p>",
    );
}

#[test]
fn parser_function_branches_are_composed() {
    check(
        document([template("#if: x", [positional(template("temp", []))])]),
        "<p>This is a test</p>",
    );
    check(
        document([template(
            "#if: x",
            [positional(vec![
                text(" "),
                style("''", vec![text("yes")]),
                text(" "),
            ])],
        )]),
        "<p><i>yes</i></p>",
    );
    check(
        document([template(
            "#switch: b",
            [named("a", "x"), named("b", wikilink("Main page", None))],
        )]),
        r#"<p><a href="/wiki/Main_page" title="Main page">Main page</a></p>"#,
    );
    check(
        document([template(
            "#ifeq: nan",
            [positional("nan"), positional("same"), positional("diff")],
        )]),
        "<p>same</p>",
    );
}

#[test]
fn parser_function_skips_untaken_branch() {
    check(
        document([template(
            "#if:",
            [positional(template("loop", [])), positional("no")],
        )]),
        "<p>no</p>",
    );
}

#[test]
fn parser_function_branch_loop() {
    let out = compose_with(
        &resolver(),
        Options::default(),
        &document([template("#if: x", [positional(template("loop", []))])]),
    );
    assert!(out.contains("Template loop detected"), "{out}");
    assert_balanced(&out);
}

#[test]
fn magic_words_before_parser_functions() {
    let mut resolver = resolver();
    resolver.magic_words_mut().insert("#now", || "now".to_string());
    check_with(&resolver, document([template("#now", [])]), "<p>now</p>");
}

#[test]
fn modules() {
    check(
        document([template("#invoke:String", [positional("len"), named("s", "abc")])]),
        "<p>3</p>",
    );
    check(
        document([template("#invoke:string", [positional("len"), positional("hello")])]),
        "<p>5</p>",
    );
    check(
        document([template("#invoke:Nope", [positional("len")])]),
        "<p>{{#invoke:Nope|len}}</p>",
    );
    check(
        document([template("#invoke:String", [positional("nope")])]),
        "<p>{{#invoke:String|nope}}</p>",
    );
    check(
        document([template("#invoke:String", [])]),
        "<p>{{#invoke:String}}</p>",
    );
}

#[test]
fn custom_module() {
    let mut modules = crate::modules::ModuleStore::new();
    modules.insert("Echo", "args", |args: &crate::modules::ModuleArgs| {
        args.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    });
    let resolver = resolver().with_modules(modules);
    check_with(
        &resolver,
        document([template(
            "#invoke:echo",
            [positional("args"), positional("a"), named("x", "y"), positional("b")],
        )]),
        "<p>1=a,x=y,2=b</p>",
    );
}

#[test]
fn unknown_node() {
    let _ = env_logger::try_init();
    let resolver = resolver();
    let result = Composer::new(&resolver).compose(&document([text("a"), Node::Unknown]));
    assert!(matches!(result, Err(Error::UnknownNodeKind)));
}

#[test]
fn default_compose() {
    assert_eq!(
        compose(&document([text("a"), wikilink("b", None)])).unwrap(),
        r#"<p>a<a href="/wiki/B" title="B">b</a></p>"#
    );
}

#[test]
fn options_from_json() {
    let options = serde_json::from_str::<Options>(r#"{"red_links": true}"#).unwrap();
    assert_eq!(options, Options::default().with_red_links(true));
}

#[test]
fn balance_checker() {
    assert_balanced("<p>a<br />b<hr><i>c</i></p>");
    assert!(std::panic::catch_unwind(|| assert_balanced("<p><i>a</p></i>")).is_err());
    assert!(std::panic::catch_unwind(|| assert_balanced("<ul><li>a")).is_err());
}

#[test]
fn tags_are_balanced() {
    let resolver = resolver();
    for node in [
        // An inline tag which is closed early by a list
        document([tag(
            "b",
            vec![],
            vec![text("bold\n"), list_item("*"), text(" item")],
        )]),
        document([
            list_item("*"),
            tag("i", vec![], vec![text("a\n")]),
            list_item("#"),
            text(" b\n\nc"),
        ]),
        // A template loop in the middle of a list
        document([list_item("*"), list_item("*"), text(" a"), template("loop", [])]),
        document([list_item(";"), text(" term"), template("ping", [])]),
        // Lists which are still pending at the end
        document([list_item("*"), list_item("#")]),
        document([text("x\n"), list_item(":")]),
        // Cells and headings outside of their usual parents
        document([table(vec![], vec![cell(vec![text("x")]), header_cell(vec![])])]),
        document([list_item("*"), heading(2, "h"), text("\n\n\n\ny")]),
        document([tag("div", vec![], vec![list_item("*"), text(" a")]), text(" b")]),
        document([text(" pre\n"), list_item("*"), text(" after")]),
    ] {
        let out = compose_with(&resolver, Options::default(), &node);
        assert_balanced(&out);
    }
}

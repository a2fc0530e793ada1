use ngxconf_syntax::{
    dump, dumps, loads, Block, Conditional, FlatAdapter, JsonAdapter, MapBlock, Node, Renderer,
    Statement, SyntaxError,
};

const FULL_SITE: &str = r#"
user nginx;
worker_processes auto;

events {
    worker_connections 1024;
}

http {
    include /etc/nginx/mime.types;
    log_format main '$remote_addr - $remote_user [$time_local] "$request"';

    map $http_upgrade $connection_upgrade {
        default upgrade;
        ''      close;
    }

    geo $blocked {
        default 0;
        10.0.0.0/8 1;
        192.168.1.20 1;
    }

    upstream backend {
        server 127.0.0.1:8080 weight=3;
        server 127.0.0.1:8081;
    }

    server {
        listen 443 ssl;
        server_name example.com www.example.com;

        location / {
            proxy_pass http://backend;
            proxy_set_header Upgrade $http_upgrade;
            if ($blocked) {
                return 403;
            }
            set $cache_key "$scheme$host$request_uri";
        }

        location ~* \.(css|js)$ {
            expires 7d;
        }

        location = /health {
            return 200 "ok";
        }
    }
}
"#;

#[test]
fn parse_render_parse_is_stable() {
    let first = loads(FULL_SITE).unwrap();
    let rendered = dumps(&first, 4).unwrap();
    let second = loads(&rendered).unwrap();
    assert_eq!(first, second);

    // Rendering is a fixed point once the text is canonical
    assert_eq!(dumps(&second, 4).unwrap(), rendered);
}

#[test]
fn round_trip_with_other_indent_widths() {
    let nodes = loads(FULL_SITE).unwrap();
    for indent in [0, 2, 8] {
        let rendered = dumps(&nodes, indent).unwrap();
        assert_eq!(loads(&rendered).unwrap(), nodes, "indent {}", indent);
    }
}

#[test]
fn separator_precedes_each_nested_block_only() {
    let nodes = loads(FULL_SITE).unwrap();
    let lines = Renderer::default().lines(&nodes).unwrap();

    for (i, line) in lines.iter().enumerate() {
        if line == " " {
            let next = &lines[i + 1];
            assert!(next.ends_with(" {"), "separator before `{}`", next);
        } else if line.ends_with(" {") && !line.starts_with(' ') {
            // Top level blocks never get a separator
            assert!(i == 0 || lines[i - 1] != " ");
        }
    }

    // map, geo, upstream, server, three locations and one if
    let separators = lines.iter().filter(|l| *l == " ").count();
    assert_eq!(separators, 8);
}

#[test]
fn statement_then_block_gets_exactly_one_separator() {
    let nodes = vec![Node::from(
        Block::new(["server"])
            .push(Statement::new(["listen", "80"]))
            .push(Block::new(["location", "/"])),
    )];
    assert_eq!(
        dumps(&nodes, 4).unwrap(),
        "server {\n    listen 80;\n \n    location / {\n    }\n}"
    );
}

#[test]
fn flat_config_renders_without_separators() {
    let nodes = loads("user nginx;\nevents { worker_connections 16; }\npid /run/nginx.pid;").unwrap();
    let rendered = dumps(&nodes, 4).unwrap();
    assert!(!rendered.lines().any(|l| l.trim().is_empty()));
}

#[test]
fn conditional_round_trip() {
    let nodes = vec![Node::from(
        Block::new(["location", "/"]).push(
            Conditional::new("$request_method = POST")
                .with_body(vec![Statement::new(["return", "405"]).into()]),
        ),
    )];
    let rendered = dumps(&nodes, 4).unwrap();
    assert_eq!(
        rendered,
        "location / {\n \n    if ($request_method = POST) {\n        return 405;\n    }\n}"
    );
    assert_eq!(loads(&rendered).unwrap(), nodes);
}

#[test]
fn map_round_trip_keeps_quoted_keys() {
    let nodes = loads(FULL_SITE).unwrap();
    let http = nodes[3].body().unwrap();
    let Node::Map(map) = &http[2] else {
        panic!("expected map, found {:?}", http[2]);
    };
    let expected = MapBlock::new("$http_upgrade", "$connection_upgrade")
        .with_entry("default", "upgrade")
        .with_entry("''", "close");
    assert_eq!(map, &expected);
}

#[test]
fn set_is_word_split_and_survives_rendering() {
    let nodes = loads(FULL_SITE).unwrap();
    let rendered = dumps(&nodes, 4).unwrap();
    assert!(rendered.contains("            set $cache_key \"$scheme$host$request_uri\";"));
}

#[test]
fn json_and_flat_exports_agree_on_text() {
    let nodes = loads("http { server { listen 80; location / { root /srv; } } }").unwrap();

    let typed = JsonAdapter::parse(&JsonAdapter::serialize(&nodes).unwrap()).unwrap();
    let flat = FlatAdapter::parse(&FlatAdapter::serialize(&nodes).unwrap()).unwrap();

    assert_eq!(dumps(&typed, 4).unwrap(), dumps(&flat, 4).unwrap());
}

#[test]
fn writer_form_ends_every_line() {
    let nodes = loads("user nginx;\nevents {}").unwrap();
    let mut out = Vec::new();
    dump(&nodes, &mut out, 4).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "user nginx;\nevents {\n}\n");
}

#[test]
fn malformed_input_is_rejected() {
    for source in ["foo { bar foo", "foo bar", "foo { bar; }}", "location = /a /b {}", "{}"] {
        let err = loads(source).unwrap_err();
        assert!(
            matches!(
                err,
                SyntaxError::UnexpectedEof { .. }
                    | SyntaxError::UnexpectedToken { .. }
                    | SyntaxError::InvalidSyntax { .. }
            ),
            "{:?} for {:?}",
            err,
            source
        );
    }
}

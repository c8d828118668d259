//! Round-trip tests against a live server.
//!
//! Set `RETAIL_LOAD_TEST_DATABASE_URL` (for example
//! `host=localhost user=postgres password=postgres dbname=retail_test`) to run
//! them; without it each test returns early.

mod common;

use std::{
    env,
    sync::{Mutex, MutexGuard},
};

use common::TestWorkspace;
use postgres::{Client, Config, NoTls};
use retail_load::load::{BatchedInsert, BulkCopy, LoadStrategy};
use retail_load::pipeline::Pipeline;
use retail_load::record::Registro;
use retail_load::schema::reset_table;
use retail_load::session::ConnectionParams;

const ROWS: &[&str] = &[
    r#"536365,85123A,"WHITE HANGING HEART T-LIGHT HOLDER",6,12/1/2010 8:26,2.55, ,United Kingdom"#,
    r#"536365,71053,"WHITE METAL LANTERN",6,12/1/2010 8:26,3.39,17850,United Kingdom"#,
    r#"536370,22728,"ALARM CLOCK BAKELIKE PINK, RED",24,12/1/2010 8:45,3.75,12583,France"#,
    r#"581587,POST,,1,12/9/2011 12:50,18,12680,France"#,
];

// Every test replaces the same table.
static TABLE_LOCK: Mutex<()> = Mutex::new(());

fn lock_table() -> MutexGuard<'static, ()> {
    TABLE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn test_config() -> Option<Config> {
    let url = env::var("RETAIL_LOAD_TEST_DATABASE_URL").ok()?;
    Some(url.parse().expect("valid postgres connection string"))
}

fn connection_params(config: &Config) -> ConnectionParams {
    let host = config
        .get_hosts()
        .first()
        .map(|host| match host {
            postgres::config::Host::Tcp(name) => name.clone(),
            #[cfg(unix)]
            postgres::config::Host::Unix(path) => path.display().to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    ConnectionParams {
        host,
        port: config.get_ports().first().copied().unwrap_or(5432),
        database: config.get_dbname().unwrap_or("postgres").to_string(),
        user: config.get_user().unwrap_or("postgres").to_string(),
        password: config
            .get_password()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default(),
        connect_timeout: None,
    }
}

fn read_back(client: &mut Client) -> Vec<Registro> {
    let mut rows = client
        .query(
            "SELECT numero_factura, codigo, descripcion, cantidad, fecha_factura, \
             precio_unitario, id_cliente, pais, mes FROM registros",
            &[],
        )
        .expect("select registros")
        .into_iter()
        .map(|row| Registro {
            numero_factura: row.get(0),
            codigo: row.get(1),
            descripcion: row.get(2),
            cantidad: row.get(3),
            fecha_factura: row.get(4),
            precio_unitario: row.get(5),
            id_cliente: row.get(6),
            pais: row.get(7),
            mes: row.get(8),
        })
        .collect::<Vec<_>>();
    sort(&mut rows);
    rows
}

fn sort(rows: &mut [Registro]) {
    rows.sort_by(|a, b| {
        (&a.numero_factura, &a.codigo).cmp(&(&b.numero_factura, &b.codigo))
    });
}

fn round_trip(strategy: Box<dyn LoadStrategy>) {
    let Some(config) = test_config() else {
        eprintln!("RETAIL_LOAD_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let _guard = lock_table();
    let workspace = TestWorkspace::new();
    let input = workspace.retail_csv("retail.csv", ROWS);
    let pipeline = Pipeline::new(strategy);
    let params = connection_params(&config);

    let mut expected = pipeline.prepare(&input).expect("prepare");
    sort(&mut expected);

    let report = pipeline.run(&input, &params).expect("first run");
    assert_eq!(report.rows_loaded, ROWS.len() as u64);

    let mut client = config.connect(NoTls).expect("connect");
    let first = read_back(&mut client);
    assert_eq!(first, expected);
    assert_eq!(first[1].codigo, "85123A");
    assert_eq!(first[1].id_cliente, 0);
    assert_eq!(first[2].descripcion, "ALARM CLOCK BAKELIKE PINK RED");
    assert_eq!(first[3].descripcion, "");

    pipeline.run(&input, &params).expect("second run");
    assert_eq!(read_back(&mut client), first);
}

#[test]
fn bulk_copy_round_trips_and_replaces_contents() {
    round_trip(Box::new(BulkCopy));
}

#[test]
fn batched_insert_round_trips_and_replaces_contents() {
    round_trip(Box::new(BatchedInsert::new(3)));
}

#[test]
fn failed_load_keeps_the_previous_table() {
    let Some(config) = test_config() else {
        eprintln!("RETAIL_LOAD_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let _guard = lock_table();
    let workspace = TestWorkspace::new();
    let good = workspace.retail_csv("good.csv", ROWS);
    let pipeline = Pipeline::new(Box::new(BulkCopy));
    let params = connection_params(&config);
    pipeline.run(&good, &params).expect("seed run");

    let mut client = config.connect(NoTls).expect("connect");
    let before = read_back(&mut client);

    let oversized = format!(
        "536365,{},HEART,6,12/1/2010 8:26,2.55,17850,United Kingdom",
        "X".repeat(300)
    );
    let bad = workspace.retail_csv("bad.csv", &[oversized.as_str()]);
    let failure = pipeline.run(&bad, &params).unwrap_err();
    assert_eq!(failure.stage, retail_load::error::Stage::Load);
    assert_eq!(read_back(&mut client), before);
}

#[test]
fn consecutive_resets_leave_an_empty_table() {
    let Some(config) = test_config() else {
        eprintln!("RETAIL_LOAD_TEST_DATABASE_URL not set; skipping");
        return;
    };
    let _guard = lock_table();
    let workspace = TestWorkspace::new();
    let input = workspace.retail_csv("retail.csv", ROWS);
    Pipeline::new(Box::new(BulkCopy))
        .run(&input, &connection_params(&config))
        .expect("seed run");

    let mut client = config.connect(NoTls).expect("connect");
    let mut tx = client.transaction().expect("begin");
    reset_table(&mut tx).expect("first reset");
    reset_table(&mut tx).expect("second reset");
    tx.commit().expect("commit");

    let count: i64 = client
        .query_one("SELECT count(*) FROM registros", &[])
        .expect("registros exists")
        .get(0);
    assert_eq!(count, 0);
    assert!(read_back(&mut client).is_empty());
}

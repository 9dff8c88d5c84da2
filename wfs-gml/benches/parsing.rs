//! Benchmarks pour le parsing des réponses GetFeature

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use wfs_gml::{parse, ParseOptions};

/// Construit une collection synthétique de `n` parcelles carrées
fn synthetic_collection(n: usize) -> String {
    let mut doc = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:FeatureCollection numberMatched="{n}" numberReturned="{n}">"#
    );

    for i in 0..n {
        let lat = 41.0 + (i / 100) as f64 * 0.001;
        let lon = 12.0 + (i % 100) as f64 * 0.001;
        doc.push_str(&format!(
            r#"<wfs:member><CP:CadastralParcel gml:id="IT.AGE.PLA.H501D_0012A0.{i}">
<CP:geometry><gml:MultiSurface srsDimension="2"><gml:surfaceMember><gml:Polygon><gml:exterior><gml:LinearRing>
<gml:posList>{lat} {lon} {lat} {lon2} {lat2} {lon2} {lat2} {lon} {lat} {lon}</gml:posList>
</gml:LinearRing></gml:exterior></gml:Polygon></gml:surfaceMember></gml:MultiSurface></CP:geometry>
<CP:label>{i}</CP:label>
<CP:nationalCadastralReference>H501D_0012A0.{i}</CP:nationalCadastralReference>
</CP:CadastralParcel></wfs:member>"#,
            lat2 = lat + 0.001,
            lon2 = lon + 0.001,
        ));
    }

    doc.push_str("</wfs:FeatureCollection>");
    doc
}

fn bench_parse_collection(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_collection");
    let options = ParseOptions::default();

    for n in [100usize, 1000] {
        let doc = synthetic_collection(n);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &doc, |b, doc| {
            b.iter(|| {
                let result = parse(black_box(doc.as_bytes()), &options).unwrap();
                black_box(result)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_collection);
criterion_main!(benches);

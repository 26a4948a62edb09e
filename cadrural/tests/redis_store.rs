//! Runs against a Redis Stack server (RedisJSON + RediSearch) when `REDIS_URL` is set.

use cadrural::{
    Client, EntityKind, ListQuery,
    documents::{DEFAULT_MAX_BYTES, DocumentStorage},
    models::{Producer, ProducerInput, ProductionUnit, ProductionUnitInput, Property, PropertyInput},
};
use tempfile::TempDir;

async fn create_test_client(dir: &TempDir) -> Option<Client> {
    let Ok(redis_url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set; skipping");
        return None;
    };
    let prefix = format!("cadrural_test_{}", uuid::Uuid::new_v4().simple());
    let documents = DocumentStorage::new(dir.path(), DEFAULT_MAX_BYTES);
    Some(
        Client::connect(&redis_url, &prefix, documents)
            .await
            .expect("Failed to connect to Redis"),
    )
}

async fn seed_owner(client: &Client) -> (Producer, Property) {
    let producer = client
        .create::<Producer>(ProducerInput {
            nome: Some("Joaquim Antônio Brandão".into()),
            cpf_cnpj: Some("321.654.987-00".into()),
            telefone: Some("(35) 99123-4567".into()),
            email: Some("joaquim@example.com".into()),
            endereco: Some("Sítio Boa Vista, zona rural".into()),
            data_cadastro: None,
        })
        .await
        .expect("producer");
    let property = client
        .create::<Property>(PropertyInput {
            nome: Some("Fazenda Três Marias".into()),
            municipio: Some("Pouso Alegre".into()),
            uf: Some("MG".into()),
            area_total: Some(210.0),
            produtor_id: Some(producer.id.clone()),
            ..Default::default()
        })
        .await
        .expect("property");
    (producer, property)
}

#[tokio::test]
async fn filters_run_through_redisearch() {
    let dir = TempDir::new().expect("tempdir");
    let Some(client) = create_test_client(&dir).await else {
        return;
    };
    let (producer, property) = seed_owner(&client).await;

    let producers = client.collection::<Producer>();
    let (page, applied) = producers.list(ListQuery::from_query("nome=brandao%20joaquim")).await.expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, producer.id);
    assert_eq!(applied["nome"], "brandao joaquim");

    let (page, _) = producers.list(ListQuery::from_query("cpf_cnpj=321.654")).await.expect("list");
    assert_eq!(page.total, 1);

    let (page, _) = producers.list(ListQuery::from_query("nome=marias")).await.expect("list");
    assert_eq!(page.total, 0);

    client
        .create::<ProductionUnit>(ProductionUnitInput {
            nome_cultura: Some("Milho".into()),
            area_total_ha: Some(42.5),
            propriedade_id: Some(property.id.clone()),
            ..Default::default()
        })
        .await
        .expect("unit");

    let (page, _) = client
        .collection::<ProductionUnit>()
        .list(ListQuery::from_query("produtor_nome=joaquim&uf=mg"))
        .await
        .expect("list");
    assert_eq!(page.total, 1);

    client.delete::<Producer>(&producer.id).await.expect("delete");
    assert_eq!(client.store().count_all(EntityKind::ProductionUnit).await.expect("count"), 0);
}

#[tokio::test]
async fn token_filters_match_substrings_with_punctuation_and_single_letters() {
    let dir = TempDir::new().expect("tempdir");
    let Some(client) = create_test_client(&dir).await else {
        return;
    };
    let (producer, property) = seed_owner(&client).await;
    let producers = client.collection::<Producer>();

    let (page, _) = producers
        .list(ListQuery::from_query("email=JOAQUIM@example.com"))
        .await
        .expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, producer.id);

    let (page, _) = producers.list(ListQuery::from_query("nome=joaquim%20o")).await.expect("list");
    assert_eq!(page.total, 1);
    let (page, _) = producers.list(ListQuery::from_query("nome=z")).await.expect("list");
    assert_eq!(page.total, 0);
    let (page, _) = producers.list(ListQuery::from_query("telefone=7")).await.expect("list");
    assert_eq!(page.total, 1);
    let (page, _) = producers.list(ListQuery::from_query("telefone=8")).await.expect("list");
    assert_eq!(page.total, 0);

    for cultura in ["Cana-de-açúcar", "Milho"] {
        client
            .create::<ProductionUnit>(ProductionUnitInput {
                nome_cultura: Some(cultura.into()),
                area_total_ha: Some(3.0),
                propriedade_id: Some(property.id.clone()),
                ..Default::default()
            })
            .await
            .expect("unit");
    }
    let units = client.collection::<ProductionUnit>();
    let (page, _) = units.list(ListQuery::from_query("nome_cultura=cana-de")).await.expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].nome_cultura, "Cana-de-açúcar");
    let (page, _) = units.list(ListQuery::from_query("nome_cultura=acucar")).await.expect("list");
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn aggregates_match_the_stored_rows() {
    let dir = TempDir::new().expect("tempdir");
    let Some(client) = create_test_client(&dir).await else {
        return;
    };
    let (_, property) = seed_owner(&client).await;
    for (cultura, area) in [("Milho", 10.0), ("Milho", 2.5), ("Arroz", 4.0)] {
        client
            .create::<ProductionUnit>(ProductionUnitInput {
                nome_cultura: Some(cultura.into()),
                area_total_ha: Some(area),
                propriedade_id: Some(property.id.clone()),
                ..Default::default()
            })
            .await
            .expect("unit");
    }

    let totals = client.totals().await.expect("totals");
    assert_eq!(totals.produtores, 1);
    assert_eq!(totals.unidades, 3);
    assert_eq!(totals.hectares, 16.5);

    let crops = client.crop_report().await.expect("crops");
    assert_eq!(crops[0].nome_cultura, "Milho");
    assert_eq!(crops[0].total_unidades, 2);
    assert_eq!(crops[0].total_hectares, 12.5);
}
